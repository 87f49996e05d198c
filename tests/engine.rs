//! End-to-end scenarios driving the engine through its public surface.

use std::collections::HashMap;
use std::rc::Rc;

use proptest::prelude::*;
use proptest::sample::Index;
use rustc_hash::FxHashMap;

use retrace::{
    collect, learn, recall, seq, string, take_while, CellId, LeftAssoc, Parse, Parser, ParserRef,
    Tokens, Value,
};

fn word() -> ParserRef {
    take_while(1, |c: char| c.is_ascii_alphabetic())
}

fn number() -> ParserRef {
    collect(take_while(1, |c: char| c.is_ascii_digit()), |parse, _, pos0| {
        let value: i64 = parse.input()[pos0..parse.pos()].parse().expect("number");
        parse.push(Rc::new(value));
    })
}

fn fold_add(parse: &mut Parse<'_>, mut drained: Vec<Value>, _pos0: usize) {
    let rhs = *drained.pop().expect("rhs").downcast_ref::<i64>().expect("i64");
    let lhs = *drained.pop().expect("lhs").downcast_ref::<i64>().expect("i64");
    parse.push(Rc::new(lhs + rhs));
}

#[test]
fn learned_text_must_repeat() {
    let grammar = seq([learn("id", word()), string("-"), recall("id")]);

    let mut parse = Parse::new("abc-abc");
    assert!(grammar.parse(&mut parse));
    assert_eq!(parse.pos(), 7);

    let mut parse = Parse::new("abc-abd");
    assert!(!grammar.parse(&mut parse));
    assert_eq!(parse.pos(), 0);
    assert_eq!(parse.log_len(), 0);
    assert_eq!(parse.stack_len(), 0);
}

#[test]
fn token_positions_resolve_by_longest_match() {
    let kw_if = string("if");
    let kw_iff = string("iff");
    let ident = word();
    let tokens = Tokens::new(vec![kw_if.clone(), kw_iff.clone(), ident.clone()]);

    // "iffy" outruns both keywords: the identifier wins the position.
    let choice = tokens.token_choice(&[kw_iff.clone(), ident.clone()]);
    let mut parse = Parse::new("iffy ");
    assert!(choice.parse(&mut parse));
    assert_eq!(parse.pos(), 4);

    // At "iff", the keyword and the identifier tie; the earlier
    // declaration wins, and it is in the choice's target set.
    tokens.flush();
    let mut parse = Parse::new("iff ");
    assert!(choice.parse(&mut parse));
    assert_eq!(parse.pos(), 3);

    // "if" would match here, but the position belongs to "iff".
    let mut parse = Parse::new("iff ");
    assert!(!tokens.token_parser(&kw_if).parse(&mut parse));
    assert_eq!(parse.pos(), 0);
}

#[test]
fn left_assoc_folds_into_a_single_value() {
    let sum = LeftAssoc::new(number(), string("+"), number()).step(fold_add);

    let mut parse = Parse::new("1+2+3");
    assert!(sum.parse(&mut parse));
    assert_eq!(parse.pos(), 5);
    assert_eq!(parse.stack_len(), 1);
    assert_eq!(parse.stack()[0].downcast_ref::<i64>(), Some(&6));
}

#[test]
fn left_assoc_requires_an_operator_by_default() {
    let sum = LeftAssoc::new(number(), string("+"), number()).step(fold_add);

    let mut parse = Parse::new("1");
    assert!(!sum.parse(&mut parse));
    assert_eq!(parse.pos(), 0);
    assert_eq!(parse.stack_len(), 0);
}

#[test]
fn the_token_cache_never_changes_observable_behavior() {
    let num = number();
    let plus = string("+");
    let tokens = Tokens::new(vec![num.clone(), plus.clone()]);
    let expr = LeftAssoc::new(
        tokens.token_parser(&num),
        tokens.token_parser(&plus),
        tokens.token_parser(&num),
    )
    .step(fold_add);

    let run = |expr: &LeftAssoc| {
        let mut parse = Parse::new("1+2+3");
        assert!(expr.parse(&mut parse));
        assert!(parse.at_end());
        assert_eq!(parse.stack_len(), 1);
        *parse.stack()[0].downcast_ref::<i64>().expect("i64")
    };

    let cold = run(&expr);
    let warm = run(&expr); // every position now comes from the cache
    tokens.flush();
    let flushed = run(&expr);
    assert_eq!(cold, 6);
    assert_eq!(warm, 6);
    assert_eq!(flushed, 6);
}

#[test]
fn failed_speculation_restores_every_piece_of_state() {
    // The first alternative learns a binding, pushes a value, and then
    // dies on the trailing "!"; the second must see a pristine state.
    let noisy = seq([
        learn("w", word()),
        collect(string("-"), |parse, _, _| parse.push(Rc::new(1i64))),
        string("!"),
    ]);
    let fallback = seq([learn("w", word()), string("-"), recall("w")]);
    let grammar = retrace::choice([noisy, fallback]);

    let mut parse = Parse::new("abc-abc");
    assert!(grammar.parse(&mut parse));
    assert_eq!(parse.pos(), 7);
}

const NAMES: CellId<FxHashMap<&'static str, String>> =
    CellId::new("engine-test.names", FxHashMap::default);
const KEYS: [&str; 3] = ["a", "b", "c"];

proptest! {
    // Every journaled step is individually reversible: rolling back to an
    // arbitrary prefix restores the stack and the cell bindings the
    // oracle recorded for that prefix.
    #[test]
    fn rollback_restores_every_prefix(
        ops in proptest::collection::vec(0u8..6, 1..32),
        cut in any::<Index>(),
    ) {
        let mut parse = Parse::new("");
        let mut stack_sizes = vec![0usize];
        let mut bindings: Vec<HashMap<&str, String>> = vec![HashMap::new()];
        for (stamp, op) in ops.iter().enumerate() {
            match *op {
                0..=2 => parse.push(Rc::new(stamp as i64)),
                _ => NAMES.bind(&mut parse, KEYS[(*op - 3) as usize], stamp.to_string()),
            }
            let mut map = bindings.last().expect("oracle").clone();
            let mut size = *stack_sizes.last().expect("oracle");
            match *op {
                0..=2 => size += 1,
                _ => {
                    map.insert(KEYS[(*op - 3) as usize], stamp.to_string());
                }
            }
            stack_sizes.push(size);
            bindings.push(map);
        }
        prop_assert_eq!(parse.log_len(), ops.len());

        let cut = cut.index(ops.len() + 1);
        parse.rollback(cut);
        prop_assert_eq!(parse.log_len(), cut);
        prop_assert_eq!(parse.stack_len(), stack_sizes[cut]);
        for key in KEYS {
            prop_assert_eq!(NAMES.lookup(&mut parse, &key), bindings[cut].get(key).cloned());
        }
    }
}
