//! Left-associative repetition.

use std::rc::Rc;

use crate::combinator::StackAction;
use crate::parse::{Parse, Value};
use crate::parser::{Parser, ParserRef, Visitor};

/// Parses `left (operator right)*`, folding the value stack as it goes.
///
/// After each successful `right`, the optional step action receives the
/// stack tail pushed since entry (drained, as with
/// [`collect`](crate::combinator::collect)) and typically pushes one
/// combined value back: left-associative folding without right
/// recursion.
///
/// By default at least one operator must match; [`operator_optional`]
/// lifts that, making a bare `left` succeed.
///
/// [`operator_optional`]: LeftAssoc::operator_optional
pub struct LeftAssoc {
    left: ParserRef,
    operator: ParserRef,
    right: ParserRef,
    operator_required: bool,
    step: Option<StackAction>,
}

impl LeftAssoc {
    /// A helper requiring at least one operator and running no step
    /// action.
    pub fn new(left: ParserRef, operator: ParserRef, right: ParserRef) -> Self {
        Self {
            left,
            operator,
            right,
            operator_required: true,
            step: None,
        }
    }

    /// Let a bare `left` with no operator succeed.
    pub fn operator_optional(mut self) -> Self {
        self.operator_required = false;
        self
    }

    /// Fold the stack after each successful `right`.
    pub fn step(mut self, action: impl Fn(&mut Parse<'_>, Vec<Value>, usize) + 'static) -> Self {
        self.step = Some(Rc::new(action));
        self
    }
}

impl Parser for LeftAssoc {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        let entry = parse.snapshot();
        if !self.left.parse(parse) {
            return false;
        }
        let mut stepped = false;
        loop {
            let attempt = parse.snapshot();
            if !self.operator.parse(parse) {
                break;
            }
            if !self.right.parse(parse) {
                parse.restore(attempt);
                break;
            }
            stepped = true;
            if let Some(step) = &self.step {
                let drained = parse.drain_from(entry.stack);
                step(parse, drained, entry.pos);
            }
            // An operator/right pair that consumed nothing and journaled
            // nothing would loop forever.
            if parse.pos() == attempt.pos && parse.log_len() == attempt.log {
                break;
            }
        }
        if !stepped && self.operator_required {
            parse.restore(entry);
            return false;
        }
        true
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![
            self.left.clone(),
            self.operator.clone(),
            self.right.clone(),
        ]
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }
}
