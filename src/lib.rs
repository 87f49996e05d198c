#![doc = include_str!("../README.md")]

mod arena;
mod cache;
pub mod combinator;
pub mod context;
pub mod effect;
pub mod leftassoc;
pub mod parse;
pub mod parser;
pub mod primitive;
pub mod recursive;
pub mod token;

pub use crate::arena::Arena;
pub use crate::combinator::{
    choice, collect, lookahead, not, opt, repeat, seq, Choice, Collect, Lookahead, Not, Opt,
    Repeat, Seq, StackAction,
};
pub use crate::context::{learn, recall, CellId, Learn, Recall};
pub use crate::effect::{effect, undo, SideEffect, Undo};
pub use crate::leftassoc::LeftAssoc;
pub use crate::parse::{Parse, ParseError, Snapshot, Value};
pub use crate::parser::{walk, Parser, ParserRef, Visitor};
pub use crate::primitive::{
    any_char, char_pred, end, string, take_while, AnyChar, CharPred, End, Str, TakeWhile,
};
pub use crate::recursive::Recursive;
pub use crate::token::{TokenChoice, TokenParser, Tokens};
