//! The polymorphic parser protocol.
//!
//! Parsers are immutable graph nodes shared behind [`ParserRef`]s. The one
//! polymorphic point is [`Parser::parse`]; [`Parser::children`] and
//! [`Parser::accept`] exist so analyses can traverse a (possibly cyclic)
//! grammar without knowing every node shape.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::parse::Parse;
use crate::recursive::Recursive;
use crate::token::{TokenChoice, TokenParser};

/// A shared, immutable parser node.
pub type ParserRef = Rc<dyn Parser>;

/// The uniform speculative-matching contract.
pub trait Parser {
    /// Attempt a match at the current cursor.
    ///
    /// On `true`, the cursor has advanced past the match and any effects
    /// sit in the journal. On `false`, the parser has already restored the
    /// state (cursor, journal, stack) to what its caller saw; a failing
    /// parser that leaves residue behind violates the contract.
    fn parse(&self, parse: &mut Parse<'_>) -> bool;

    /// The ordered child parsers, for traversal.
    fn children(&self) -> Vec<ParserRef> {
        Vec::new()
    }

    /// Double-dispatch hook for [`Visitor`]s.
    fn accept(&self, visitor: &mut dyn Visitor);
}

/// A grammar analysis, dispatched over parser shapes.
///
/// The shapes the engine treats specially get their own hooks; everything
/// else funnels through [`visit`](Visitor::visit).
pub trait Visitor {
    /// Generic fallback for any parser node.
    fn visit(&mut self, _parser: &dyn Parser) {}

    /// A singleton token recognizer.
    fn visit_token(&mut self, parser: &TokenParser) {
        self.visit(parser);
    }

    /// A token-choice recognizer.
    fn visit_token_choice(&mut self, parser: &TokenChoice) {
        self.visit(parser);
    }

    /// A forward-declared placeholder.
    fn visit_recursive(&mut self, parser: &Recursive) {
        self.visit(parser);
    }
}

/// Depth-first traversal over a parser graph, visiting each node once.
///
/// Grammars are commonly cyclic; nodes are deduplicated by pointer
/// identity.
pub fn walk(root: &ParserRef, visitor: &mut dyn Visitor) {
    let mut seen = FxHashSet::default();
    let mut pending = vec![Rc::clone(root)];
    while let Some(parser) = pending.pop() {
        if !seen.insert(Rc::as_ptr(&parser) as *const () as usize) {
            continue;
        }
        parser.accept(visitor);
        let mut children = parser.children();
        children.reverse();
        pending.append(&mut children);
    }
}
