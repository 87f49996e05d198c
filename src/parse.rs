//! The shared mutable parse state.
//!
//! If you just want to match some input, [`Parse::new`] followed by
//! [`Parse::run`] is all you need. The rest of this module is the contract
//! that parsers and combinator authors build against.
//!
//! # Writing a parser
//!
//! A parser is anything implementing [`Parser`]: it is handed a
//! `&mut Parse`, tries to match at the current cursor, and answers with a
//! `bool`. On success the cursor has advanced past the match and any
//! mutations sit in the journal. On failure the parser restores the state
//! itself before returning, so its caller observes no net change.
//!
//! ```
//! use retrace::{Parse, Parser, string};
//!
//! let word = string("let");
//! let mut parse = Parse::new("letter");
//! assert!(word.parse(&mut parse));
//! assert_eq!(parse.pos(), 3);
//! ```
//!
//! # Speculation
//!
//! Composite parsers take a [`Snapshot`] before trying an alternative and
//! [`restore`](Parse::restore) it when the alternative fails. Restoring
//! rolls the journal back to the snapshot length, running the undo thunks
//! of the suffix in reverse order, and resets the cursor.
//!
//! ```
//! use retrace::{Parse, Parser, string};
//!
//! let word = string("let");
//! let mut parse = Parse::new("letter");
//! let snapshot = parse.snapshot();
//! assert!(word.parse(&mut parse));
//! parse.restore(snapshot);
//! assert_eq!(parse.pos(), 0);
//! ```

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::effect::{effect, undo, Applied, SideEffect};
use crate::parser::Parser;

/// A value produced by a parser, as it lives on the parse stack.
///
/// Values are shared immutably; undoing a stack operation re-inserts the
/// same handles it removed.
pub type Value = Rc<dyn Any>;

/// The error a [`Parse::run`] driver call reports.
///
/// Match failure is ordinary control flow inside a parse
/// (`parse → false`); this type only exists at the driver boundary.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The root parser did not match at all.
    #[error("no match at byte offset {pos}")]
    NoMatch {
        /// Cursor position after the failed attempt.
        pos: usize,
    },
    /// The root parser matched a prefix but input remains.
    #[error("trailing input left at byte offset {pos}")]
    Trailing {
        /// Cursor position where matching stopped.
        pos: usize,
    },
}

/// A `(pos, journal length, stack size)` triple taken before speculation.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
    /// Cursor position at the time of the snapshot.
    pub pos: usize,
    /// Journal length at the time of the snapshot.
    pub log: usize,
    /// Value-stack size at the time of the snapshot.
    pub stack: usize,
}

/// The mutable context of one parse: input, cursor, value stack, journal
/// of reversible effects, and named state cells.
///
/// A `Parse` is owned by exactly one parse invocation. Parsers themselves
/// are immutable after construction and freely shared.
pub struct Parse<'s> {
    input: &'s str,
    pos: usize,
    stack: Vec<Value>,
    log: Vec<Applied>,
    cells: FxHashMap<&'static str, Box<dyn Any>>,
}

impl<'s> Parse<'s> {
    /// Create a parse over the given input, cursor at the start.
    pub fn new(input: &'s str) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            log: Vec::new(),
            cells: FxHashMap::default(),
        }
    }

    /// The full input.
    pub fn input(&self) -> &'s str {
        self.input
    }

    /// The current cursor position, a byte offset into the input.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The unconsumed remainder of the input.
    pub fn rest(&self) -> &'s str {
        &self.input[self.pos..]
    }

    /// Whether the cursor sits at the end of the input.
    pub fn at_end(&self) -> bool {
        self.pos == self.input.len()
    }

    /// Advance the cursor by `n` bytes. Only leaf matchers move the
    /// cursor forward; composites restore it through snapshots.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.input.len(), "cursor past end of input");
        self.pos += n;
    }

    pub(crate) fn set_pos(&mut self, pos: usize) {
        debug_assert!(pos <= self.input.len());
        self.pos = pos;
    }

    /// The value stack, oldest entry first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// The number of values on the stack.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Push a value. The push is journaled: undoing it pops the value
    /// again.
    pub fn push(&mut self, value: Value) {
        let e = effect(move |p: &mut Parse<'_>| {
            p.stack.push(value.clone());
            undo(|p: &mut Parse<'_>| {
                p.stack.pop();
            })
        });
        self.apply(e);
    }

    /// Remove and return every stack entry at index `from` and beyond.
    ///
    /// The drain is journaled: undoing it puts the removed entries back.
    /// Stack actions use this to fold the values a child parser pushed.
    pub fn drain_from(&mut self, from: usize) -> Vec<Value> {
        let drained: Vec<Value> = self.stack[from..].to_vec();
        let e = effect(move |p: &mut Parse<'_>| {
            let tail = p.stack.split_off(from);
            undo(move |p: &mut Parse<'_>| p.stack.extend(tail))
        });
        self.apply(e);
        drained
    }

    /// Apply a side effect and journal it together with its undo thunk.
    pub fn apply(&mut self, effect: SideEffect) {
        let undo = effect(self);
        self.log.push(Applied {
            effect,
            undo: Some(undo),
        });
    }

    /// The current journal length.
    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Roll the journal back to a prior length, running the undo thunks of
    /// the suffix in reverse order.
    pub fn rollback(&mut self, len: usize) {
        debug_assert!(len <= self.log.len(), "rollback target beyond journal");
        while self.log.len() > len {
            let mut applied = self.log.pop().expect("journal entry");
            let undo = applied
                .undo
                .take()
                .expect("internal error: journal entry already undone");
            undo(self);
        }
    }

    /// The effects journaled since `from`, detached for replay.
    pub(crate) fn delta(&self, from: usize) -> Vec<SideEffect> {
        self.log[from..].iter().map(|a| a.effect.clone()).collect()
    }

    /// Record the current `(pos, journal length, stack size)`.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pos: self.pos,
            log: self.log.len(),
            stack: self.stack.len(),
        }
    }

    /// Restore a snapshot: roll back the journal, reset the cursor, and
    /// truncate the stack to its recorded size.
    ///
    /// Since stack operations are themselves journaled, the truncation is
    /// a backstop; rollback alone already restored the stack.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.rollback(snapshot.log);
        self.pos = snapshot.pos;
        debug_assert_eq!(
            self.stack.len(),
            snapshot.stack,
            "rollback left the value stack inconsistent with its snapshot"
        );
        self.stack.truncate(snapshot.stack);
    }

    pub(crate) fn cell_entry(
        &mut self,
        name: &'static str,
        init: impl FnOnce() -> Box<dyn Any>,
    ) -> &mut Box<dyn Any> {
        self.cells.entry(name).or_insert_with(init)
    }

    pub(crate) fn cell_replace(
        &mut self,
        name: &'static str,
        value: Box<dyn Any>,
    ) -> Option<Box<dyn Any>> {
        self.cells.insert(name, value)
    }

    pub(crate) fn cell_restore(&mut self, name: &'static str, prior: Option<Box<dyn Any>>) {
        match prior {
            Some(value) => {
                self.cells.insert(name, value);
            }
            None => {
                self.cells.remove(name);
            }
        }
    }

    /// Drive `root` over the whole input.
    ///
    /// ```
    /// use retrace::{Parse, string};
    ///
    /// let word = string("abc");
    /// assert!(Parse::new("abc").run(&*word).is_ok());
    /// assert!(Parse::new("abcd").run(&*word).is_err()); // trailing input
    /// ```
    pub fn run(&mut self, root: &dyn Parser) -> Result<(), ParseError> {
        if !root.parse(self) {
            return Err(ParseError::NoMatch { pos: self.pos });
        }
        if !self.at_end() {
            return Err(ParseError::Trailing { pos: self.pos });
        }
        Ok(())
    }
}

impl fmt::Debug for Parse<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parse")
            .field("pos", &self.pos)
            .field("stack", &self.stack.len())
            .field("log", &self.log.len())
            .finish_non_exhaustive()
    }
}
