//! Composite parsers.
//!
//! Composites never move the cursor themselves. Each one snapshots
//! `(pos, journal, stack)` before speculating and restores the snapshot
//! when an alternative fails, so a `false` from any parser here means "no
//! net change".

use std::rc::Rc;

use crate::parse::{Parse, Value};
use crate::parser::{Parser, ParserRef, Visitor};

/// An action over the stack tail a child parser produced.
///
/// Receives the drained tail (already removed from the stack) and the
/// cursor position where the child started matching.
pub type StackAction = Rc<dyn Fn(&mut Parse<'_>, Vec<Value>, usize)>;

pub struct Seq {
    children: Vec<ParserRef>,
}

/// Match every child in order.
pub fn seq(children: impl IntoIterator<Item = ParserRef>) -> ParserRef {
    Rc::new(Seq {
        children: children.into_iter().collect(),
    })
}

impl Parser for Seq {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        let snapshot = parse.snapshot();
        for child in &self.children {
            if !child.parse(parse) {
                parse.restore(snapshot);
                return false;
            }
        }
        true
    }

    fn children(&self) -> Vec<ParserRef> {
        self.children.clone()
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }
}

pub struct Choice {
    children: Vec<ParserRef>,
}

/// Match the first child that succeeds.
pub fn choice(children: impl IntoIterator<Item = ParserRef>) -> ParserRef {
    Rc::new(Choice {
        children: children.into_iter().collect(),
    })
}

impl Parser for Choice {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        let snapshot = parse.snapshot();
        for child in &self.children {
            if child.parse(parse) {
                return true;
            }
            debug_assert_eq!(
                parse.log_len(),
                snapshot.log,
                "failed alternative left journaled effects behind"
            );
            debug_assert_eq!(
                parse.pos(),
                snapshot.pos,
                "failed alternative left the cursor moved"
            );
            parse.restore(snapshot);
        }
        false
    }

    fn children(&self) -> Vec<ParserRef> {
        self.children.clone()
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }
}

pub struct Repeat {
    child: ParserRef,
    at_least: usize,
}

/// Match the child as many times as possible, requiring `at_least`
/// successes.
pub fn repeat(child: ParserRef, at_least: usize) -> ParserRef {
    Rc::new(Repeat { child, at_least })
}

impl Parser for Repeat {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        let snapshot = parse.snapshot();
        let mut count = 0;
        loop {
            let before = (parse.pos(), parse.log_len());
            if !self.child.parse(parse) {
                break;
            }
            count += 1;
            // A match that consumed nothing and journaled nothing would
            // repeat forever.
            if (parse.pos(), parse.log_len()) == before {
                break;
            }
        }
        if count < self.at_least {
            parse.restore(snapshot);
            return false;
        }
        true
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.child.clone()]
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }
}

pub struct Opt {
    child: ParserRef,
}

/// Match the child if possible; succeed either way.
pub fn opt(child: ParserRef) -> ParserRef {
    Rc::new(Opt { child })
}

impl Parser for Opt {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        let _ = self.child.parse(parse);
        true
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.child.clone()]
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }
}

pub struct Not {
    child: ParserRef,
}

/// Succeed iff the child fails; consumes nothing either way.
pub fn not(child: ParserRef) -> ParserRef {
    Rc::new(Not { child })
}

impl Parser for Not {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        let snapshot = parse.snapshot();
        if self.child.parse(parse) {
            parse.restore(snapshot);
            false
        } else {
            true
        }
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.child.clone()]
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }
}

pub struct Lookahead {
    child: ParserRef,
}

/// Succeed iff the child succeeds; consumes nothing either way.
pub fn lookahead(child: ParserRef) -> ParserRef {
    Rc::new(Lookahead { child })
}

impl Parser for Lookahead {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        let snapshot = parse.snapshot();
        if self.child.parse(parse) {
            parse.restore(snapshot);
            true
        } else {
            false
        }
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.child.clone()]
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }
}

pub struct Collect {
    child: ParserRef,
    action: StackAction,
}

/// Run a stack action over whatever the child pushed.
///
/// On child success the entries pushed beyond the entry stack size are
/// drained (a journaled operation) and handed to the action together with
/// the position the child started at; the action typically pushes one
/// combined value back.
pub fn collect(
    child: ParserRef,
    action: impl Fn(&mut Parse<'_>, Vec<Value>, usize) + 'static,
) -> ParserRef {
    Rc::new(Collect {
        child,
        action: Rc::new(action),
    })
}

impl Parser for Collect {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        let snapshot = parse.snapshot();
        if !self.child.parse(parse) {
            return false;
        }
        let drained = parse.drain_from(snapshot.stack);
        (self.action)(parse, drained, snapshot.pos);
        true
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.child.clone()]
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }
}
