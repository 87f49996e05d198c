use crate::arena::{Arena, Slot};
use crate::parse::Parse;
use crate::parser::{Parser, ParserRef, Visitor};

/// A forward-declared parser, for cyclic grammars.
///
/// Declare the placeholder first, use clones of it inside the grammar,
/// then define it exactly once before the first parse. The [`Arena`] the
/// placeholder was declared in must stay alive as long as the grammar is
/// in use.
///
/// ```
/// use std::rc::Rc;
/// use retrace::{choice, seq, string, Arena, Parse, ParserRef, Recursive};
///
/// // parens = "(" parens ")" | ""
/// let arena = Arena::new();
/// let parens = Recursive::declare(&arena);
/// let inner: ParserRef = Rc::new(parens.clone());
/// let parens = parens.define(choice([
///     seq([string("("), inner, string(")")]),
///     string(""),
/// ]));
///
/// assert!(Parse::new("((()))").run(&parens).is_ok());
/// assert!(Parse::new("(()").run(&parens).is_err());
/// ```
#[derive(Clone)]
pub struct Recursive {
    inner: Slot,
}

impl Recursive {
    pub fn declare(arena: &Arena) -> Self {
        Recursive {
            inner: arena.alloc(),
        }
    }

    pub fn define(self, parser: ParserRef) -> Self {
        self.inner.store(parser);
        Recursive { inner: self.inner }
    }
}

impl Parser for Recursive {
    #[inline(always)]
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        self.inner
            .get()
            .expect("recursive parser used before it was defined")
            .parse(parse)
    }

    fn children(&self) -> Vec<ParserRef> {
        self.inner.get().into_iter().collect()
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit_recursive(self);
    }
}
