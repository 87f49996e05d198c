//! Named parse-state cells and the context-sensitive primitives built on
//! them.
//!
//! A cell is declared once, with a stable identifier and an initializer,
//! and materializes on a [`Parse`] the first time it is touched. Reading
//! is free-form; every mutation goes through a journaled effect whose undo
//! restores the previous value, so cells roll back together with the rest
//! of the parse.
//!
//! ```
//! use retrace::{CellId, Parse};
//!
//! const DEPTH: CellId<u32> = CellId::new("depth", || 0);
//!
//! let mut parse = Parse::new("");
//! assert_eq!(*DEPTH.get(&mut parse), 0);
//! let mark = parse.log_len();
//! DEPTH.set(&mut parse, 3);
//! assert_eq!(*DEPTH.get(&mut parse), 3);
//! parse.rollback(mark);
//! assert_eq!(*DEPTH.get(&mut parse), 0);
//! ```

use std::hash::Hash;
use std::marker::PhantomData;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::effect::{effect, undo};
use crate::parse::Parse;
use crate::parser::{Parser, ParserRef, Visitor};

/// A declared parse-state cell: a stable identifier plus an initializer.
///
/// Two cells with the same identifier name the same storage; declaring
/// them with different types is a programming error caught by a panic on
/// access.
pub struct CellId<T> {
    name: &'static str,
    init: fn() -> T,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for CellId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CellId<T> {}

impl<T: 'static> CellId<T> {
    /// Declare a cell.
    pub const fn new(name: &'static str, init: fn() -> T) -> Self {
        Self {
            name,
            init,
            _marker: PhantomData,
        }
    }

    /// The cell's stable identifier.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the cell, materializing it on first access.
    pub fn get<'p>(&self, parse: &'p mut Parse<'_>) -> &'p T {
        let name = self.name;
        let init = self.init;
        parse
            .cell_entry(name, move || Box::new(init()))
            .downcast_ref::<T>()
            .unwrap_or_else(|| panic!("internal error: cell `{name}` holds another type"))
    }

    /// Replace the cell's value through a journaled effect whose undo
    /// restores the previous value (or the cell's absence).
    pub fn set(&self, parse: &mut Parse<'_>, value: T)
    where
        T: Clone,
    {
        let name = self.name;
        let e = effect(move |p: &mut Parse<'_>| {
            let prior = p.cell_replace(name, Box::new(value.clone()));
            undo(move |p: &mut Parse<'_>| p.cell_restore(name, prior))
        });
        parse.apply(e);
    }
}

impl<K, V> CellId<FxHashMap<K, V>>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    /// Bind `key` to `value` in a map-shaped cell.
    ///
    /// The binding is a journaled effect at entry granularity: its undo
    /// restores the key's previous binding, or removes the key if it was
    /// unbound.
    pub fn bind(&self, parse: &mut Parse<'_>, key: K, value: V) {
        let name = self.name;
        let init = self.init;
        let e = effect(move |p: &mut Parse<'_>| {
            let map = p
                .cell_entry(name, move || Box::new(init()))
                .downcast_mut::<FxHashMap<K, V>>()
                .unwrap_or_else(|| panic!("internal error: cell `{name}` holds another type"));
            let prior = map.insert(key.clone(), value.clone());
            let key = key.clone();
            undo(move |p: &mut Parse<'_>| {
                let map = p
                    .cell_entry(name, || unreachable!("cell vanished during undo"))
                    .downcast_mut::<FxHashMap<K, V>>()
                    .expect("internal error: cell type changed during undo");
                match prior {
                    Some(value) => {
                        map.insert(key, value);
                    }
                    None => {
                        map.remove(&key);
                    }
                }
            })
        });
        parse.apply(e);
    }

    /// Look a key up in a map-shaped cell.
    pub fn lookup(&self, parse: &mut Parse<'_>, key: &K) -> Option<V> {
        self.get(parse).get(key).cloned()
    }
}

/// The cell backing [`learn`]/[`recall`].
const BINDINGS: CellId<FxHashMap<&'static str, String>> =
    CellId::new("retrace.bindings", FxHashMap::default);

pub struct Learn {
    key: &'static str,
    child: ParserRef,
}

/// Match the child, then bind the text it consumed under `key`.
///
/// The binding is journaled: backtracking past the `learn` restores
/// whatever the key was bound to before.
pub fn learn(key: &'static str, child: ParserRef) -> ParserRef {
    Rc::new(Learn { key, child })
}

impl Parser for Learn {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        let start = parse.pos();
        if !self.child.parse(parse) {
            return false;
        }
        let text = parse.input()[start..parse.pos()].to_owned();
        BINDINGS.bind(parse, self.key, text);
        true
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.child.clone()]
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }
}

pub struct Recall {
    key: &'static str,
}

/// Match exactly the text a previous [`learn`] bound under `key`.
///
/// Journals nothing. Recalling a key no `learn` has bound is a
/// programming error and panics.
pub fn recall(key: &'static str) -> ParserRef {
    Rc::new(Recall { key })
}

impl Parser for Recall {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        let Some(text) = BINDINGS.lookup(parse, &self.key) else {
            panic!("recall of key `{}` before any learn bound it", self.key);
        };
        if parse.rest().starts_with(text.as_str()) {
            parse.advance(text.len());
            true
        } else {
            false
        }
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }
}
