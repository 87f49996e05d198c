//! The reversible side-effect protocol.
//!
//! Every user-visible mutation of a [`Parse`], be it a value pushed on
//! the stack or a binding written into a parse-state cell, is performed by a
//! [`SideEffect`]. Applying an effect mutates the state and hands back the
//! [`Undo`] thunk that exactly reverses it; the parse journals both, so a
//! failed alternative is unwound by running the journal suffix backwards.
//!
//! Effects are `Fn`, not `FnOnce`: the token engine detaches the effects a
//! token produced and replays them on every later visit to the same
//! position. Undo thunks are one-shot and must not schedule further
//! effects.

use std::rc::Rc;

use crate::parse::Parse;

/// A one-shot thunk reversing a single applied effect.
pub type Undo = Box<dyn FnOnce(&mut Parse<'_>)>;

/// A reversible, replayable mutation of the parse state.
pub type SideEffect = Rc<dyn Fn(&mut Parse<'_>) -> Undo>;

/// Wrap a closure as a [`SideEffect`].
pub fn effect<F>(f: F) -> SideEffect
where
    F: Fn(&mut Parse<'_>) -> Undo + 'static,
{
    Rc::new(f)
}

/// Wrap a closure as an [`Undo`] thunk.
pub fn undo<F>(f: F) -> Undo
where
    F: FnOnce(&mut Parse<'_>) + 'static,
{
    Box::new(f)
}

/// A journal entry: the effect that ran, paired with the thunk that
/// reverses it. The undo is taken out exactly once, on rollback.
pub(crate) struct Applied {
    pub(crate) effect: SideEffect,
    pub(crate) undo: Option<Undo>,
}
