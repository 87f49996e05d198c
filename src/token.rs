//! Longest-match tokenization.
//!
//! A [`Tokens`] set treats a fixed, ordered array of base parsers as
//! mutually exclusive: at any input position, the base whose successful
//! match ends furthest to the right wins, with ties going to the earlier
//! declaration. Resolution runs at most once per position: the winner
//! (or the absence of one) is cached, together with the journaled effects
//! the winning match produced, detached so they can be replayed on every
//! later visit.
//!
//! The set owns its cache, so one `Tokens` instance is bound to a single
//! parse at a time; call [`flush`](Tokens::flush) before reusing it on
//! another input.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::cache::PosCache;
use crate::effect::SideEffect;
use crate::parse::Parse;
use crate::parser::{Parser, ParserRef, Visitor};

/// One resolved token: the winning base, where it ended, and the effects
/// its match journaled.
#[derive(Clone)]
struct TokenResult {
    index: u32,
    end: usize,
    delta: Vec<SideEffect>,
}

/// A fixed set of mutually-exclusive token recognizers with a
/// position-indexed result cache.
///
/// `Tokens` is a cheap handle; clones share the base array and the cache.
#[derive(Clone)]
pub struct Tokens {
    inner: Rc<TokensInner>,
}

struct TokensInner {
    bases: Vec<ParserRef>,
    cache: RefCell<PosCache<Option<TokenResult>>>,
}

impl Tokens {
    /// Build a token set over `bases`, in declaration order.
    ///
    /// Panics if `bases` is empty.
    pub fn new(bases: Vec<ParserRef>) -> Self {
        assert!(!bases.is_empty(), "token set needs at least one base parser");
        Self {
            inner: Rc::new(TokensInner {
                bases,
                cache: RefCell::new(PosCache::new()),
            }),
        }
    }

    /// Like [`new`](Tokens::new), with an explicit initial slot count for
    /// the position cache.
    pub fn with_cache_capacity(bases: Vec<ParserRef>, slots: usize) -> Self {
        assert!(!bases.is_empty(), "token set needs at least one base parser");
        Self {
            inner: Rc::new(TokensInner {
                bases,
                cache: RefCell::new(PosCache::with_capacity(slots)),
            }),
        }
    }

    /// A recognizer that accepts a token only if `base` wins the position.
    ///
    /// Panics if `base` is not in this set's base array.
    pub fn token_parser(&self, base: &ParserRef) -> ParserRef {
        Rc::new(TokenParser {
            tokens: self.clone(),
            target: self.index_of(base),
        })
    }

    /// A recognizer accepting a token won by any of `bases`.
    ///
    /// Panics if any of `bases` is not in this set's base array.
    pub fn token_choice(&self, bases: &[ParserRef]) -> ParserRef {
        Rc::new(TokenChoice {
            tokens: self.clone(),
            targets: bases.iter().map(|base| self.index_of(base)).collect(),
        })
    }

    /// Empty the position cache. Required between parses that reuse this
    /// set.
    pub fn flush(&self) {
        debug!("token cache flushed");
        self.inner.cache.borrow_mut().clear();
    }

    fn index_of(&self, base: &ParserRef) -> u32 {
        self.inner
            .bases
            .iter()
            .position(|candidate| Rc::ptr_eq(candidate, base))
            .unwrap_or_else(|| panic!("parser is not in this token set's base array"))
            as u32
    }

    /// Longest-match resolution at the current position. The parse state
    /// is left exactly as found.
    fn resolve(&self, parse: &mut Parse<'_>) -> Option<TokenResult> {
        let snapshot = parse.snapshot();
        let mut best: Option<TokenResult> = None;
        // Strict greater-than: earlier declarations win ties, and
        // zero-width matches never produce a token.
        let mut best_end = snapshot.pos;
        for (index, base) in self.inner.bases.iter().enumerate() {
            if base.parse(parse) {
                if parse.pos() > best_end {
                    best_end = parse.pos();
                    best = Some(TokenResult {
                        index: index as u32,
                        end: parse.pos(),
                        delta: parse.delta(snapshot.log),
                    });
                }
                parse.restore(snapshot);
            }
        }
        trace!(
            pos = snapshot.pos,
            winner = best.as_ref().map(|b| b.index),
            end = best.as_ref().map(|b| b.end),
            "token resolved"
        );
        best
    }

    fn lookup(&self, parse: &mut Parse<'_>) -> Option<TokenResult> {
        let pos = parse.pos();
        if let Some(entry) = self.inner.cache.borrow().get(pos) {
            return entry.clone();
        }
        let resolved = self.resolve(parse);
        self.inner.cache.borrow_mut().insert(pos, resolved.clone());
        resolved
    }

    fn matches(&self, parse: &mut Parse<'_>, targets: &[u32]) -> bool {
        let Some(result) = self.lookup(parse) else {
            return false;
        };
        if !targets.contains(&result.index) {
            return false;
        }
        parse.set_pos(result.end);
        for effect in &result.delta {
            parse.apply(effect.clone());
        }
        true
    }

    fn base(&self, target: u32) -> ParserRef {
        self.inner.bases[target as usize].clone()
    }
}

/// A singleton token recognizer; see [`Tokens::token_parser`].
pub struct TokenParser {
    tokens: Tokens,
    target: u32,
}

impl TokenParser {
    /// The index of the target base in the set's array.
    pub fn target(&self) -> usize {
        self.target as usize
    }
}

impl Parser for TokenParser {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        self.tokens.matches(parse, std::slice::from_ref(&self.target))
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.tokens.base(self.target)]
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit_token(self);
    }
}

/// A token recognizer over several bases; see [`Tokens::token_choice`].
pub struct TokenChoice {
    tokens: Tokens,
    targets: Vec<u32>,
}

impl TokenChoice {
    /// The indices of the target bases in the set's array.
    pub fn targets(&self) -> impl Iterator<Item = usize> + '_ {
        self.targets.iter().map(|&t| t as usize)
    }
}

impl Parser for TokenChoice {
    fn parse(&self, parse: &mut Parse<'_>) -> bool {
        self.tokens.matches(parse, &self.targets)
    }

    fn children(&self) -> Vec<ParserRef> {
        self.targets.iter().map(|&t| self.tokens.base(t)).collect()
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit_token_choice(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::collect;
    use crate::primitive::{string, take_while};

    fn word() -> ParserRef {
        take_while(1, |c| c.is_ascii_alphabetic())
    }

    #[test]
    fn the_longest_match_wins() {
        let kw_if = string("if");
        let kw_iff = string("iff");
        let ident = word();
        let tokens = Tokens::new(vec![kw_if.clone(), kw_iff.clone(), ident.clone()]);

        // "iffy" is longer than both keywords, so the identifier wins.
        let mut parse = Parse::new("iffy ");
        assert!(tokens.token_parser(&ident).parse(&mut parse));
        assert_eq!(parse.pos(), 4);
    }

    #[test]
    fn ties_go_to_the_earlier_declaration() {
        let kw_if = string("if");
        let kw_iff = string("iff");
        let ident = word();
        let tokens = Tokens::new(vec![kw_if.clone(), kw_iff.clone(), ident.clone()]);

        // "iff" and the identifier both end at 3; the keyword is declared
        // earlier, so the position is its.
        let mut parse = Parse::new("iff ");
        assert!(!tokens.token_parser(&ident).parse(&mut parse));
        assert_eq!(parse.pos(), 0);
        assert!(tokens.token_parser(&kw_iff).parse(&mut parse));
        assert_eq!(parse.pos(), 3);
    }

    #[test]
    fn a_losing_target_fails_even_though_it_would_match() {
        let kw_if = string("if");
        let kw_iff = string("iff");
        let ident = word();
        let tokens = Tokens::new(vec![kw_if.clone(), kw_iff.clone(), ident.clone()]);

        // "if" matches at 0, but the position belongs to the longer "iff".
        let mut parse = Parse::new("iff ");
        assert!(!tokens.token_parser(&kw_if).parse(&mut parse));
        assert_eq!(parse.pos(), 0);
    }

    #[test]
    fn token_choice_accepts_any_of_its_targets() {
        let kw_if = string("if");
        let kw_iff = string("iff");
        let ident = word();
        let tokens = Tokens::new(vec![kw_if.clone(), kw_iff.clone(), ident.clone()]);
        let iff_or_ident = tokens.token_choice(&[kw_iff.clone(), ident.clone()]);

        let mut parse = Parse::new("iff ");
        assert!(iff_or_ident.parse(&mut parse));
        assert_eq!(parse.pos(), 3);

        let mut parse = Parse::new("if ");
        assert!(!iff_or_ident.parse(&mut parse));
        assert_eq!(parse.pos(), 0);
    }

    #[test]
    fn cached_deltas_replay_on_every_visit() {
        let number = collect(take_while(1, |c| c.is_ascii_digit()), |parse, _, pos0| {
            let value: i64 = parse.input()[pos0..parse.pos()].parse().expect("number");
            parse.push(Rc::new(value));
        });
        let tokens = Tokens::new(vec![number.clone()]);
        let token = tokens.token_parser(&number);

        let mut parse = Parse::new("42");
        assert!(token.parse(&mut parse));
        assert_eq!(parse.stack()[0].downcast_ref::<i64>(), Some(&42));

        // Same set, fresh parse: the cache entry replays the push.
        let mut parse = Parse::new("42");
        assert!(token.parse(&mut parse));
        assert_eq!(parse.pos(), 2);
        assert_eq!(parse.stack()[0].downcast_ref::<i64>(), Some(&42));
    }

    #[test]
    fn flush_forgets_cached_positions() {
        let a = string("a");
        let tokens = Tokens::new(vec![a.clone()]);
        let token = tokens.token_parser(&a);

        let mut parse = Parse::new("a");
        assert!(token.parse(&mut parse));

        tokens.flush();
        let mut parse = Parse::new("a");
        assert!(token.parse(&mut parse));
        assert_eq!(parse.pos(), 1);
    }

    #[test]
    fn no_token_is_cached_too() {
        let a = string("a");
        let tokens = Tokens::new(vec![a.clone()]);
        let token = tokens.token_parser(&a);

        let mut parse = Parse::new("b");
        assert!(!token.parse(&mut parse));
        assert!(!token.parse(&mut parse));
        assert_eq!(parse.pos(), 0);
    }

    #[test]
    fn resolution_itself_leaves_no_trace() {
        let number = collect(take_while(1, |c| c.is_ascii_digit()), |parse, _, pos0| {
            let value: i64 = parse.input()[pos0..parse.pos()].parse().expect("number");
            parse.push(Rc::new(value));
        });
        let letter = string("x");
        let tokens = Tokens::new(vec![number.clone(), letter.clone()]);

        // The number base matches and journals a push during resolution,
        // but the caller only asked for "x".
        let mut parse = Parse::new("42");
        assert!(!tokens.token_parser(&letter).parse(&mut parse));
        assert_eq!(parse.pos(), 0);
        assert_eq!(parse.stack_len(), 0);
        assert_eq!(parse.log_len(), 0);
    }

    #[test]
    #[should_panic(expected = "not in this token set's base array")]
    fn a_foreign_base_is_rejected_at_construction() {
        let a = string("a");
        let tokens = Tokens::new(vec![a]);
        let other = string("b");
        let _ = tokens.token_parser(&other);
    }

    #[test]
    #[should_panic(expected = "at least one base parser")]
    fn an_empty_base_array_is_rejected() {
        let _ = Tokens::new(Vec::new());
    }
}
