use std::cell::{Cell, OnceCell};
use std::rc::{Rc, Weak};

use crate::parser::ParserRef;

/// Backing storage for forward-declared parsers.
///
/// Each declaration takes a slot that is filled exactly once, before the
/// first parse; the slots give cyclic grammars stable, shareable node
/// identities.
pub struct Arena {
    inner: Rc<ArenaInner>,
}

struct ArenaInner {
    alloc: Cell<usize>,
    slots: Box<[OnceCell<ParserRef>]>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(slots: usize) -> Self {
        let slots = (0..slots).map(|_| OnceCell::new()).collect();
        Self {
            inner: Rc::new(ArenaInner {
                alloc: Cell::new(0),
                slots,
            }),
        }
    }

    pub(crate) fn alloc(&self) -> Slot {
        let index = self.inner.alloc.get();
        if index >= self.inner.slots.len() {
            panic!("internal error: arena full");
        }
        self.inner.alloc.set(index + 1);

        Slot {
            arena: Rc::downgrade(&self.inner),
            index,
        }
    }
}

#[derive(Clone)]
pub(crate) struct Slot {
    arena: Weak<ArenaInner>,
    index: usize,
}

impl Slot {
    fn arena(&self) -> Rc<ArenaInner> {
        self.arena
            .upgrade()
            .expect("internal error: arena already dropped")
    }

    pub(crate) fn store(&self, parser: ParserRef) {
        self.arena().slots[self.index]
            .set(parser)
            .unwrap_or_else(|_| panic!("internal error: slot already occupied"));
    }

    pub(crate) fn get(&self) -> Option<ParserRef> {
        self.arena().slots[self.index].get().cloned()
    }
}
