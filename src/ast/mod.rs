//! Abstract syntax tree for the shell grammar.
//!
//! `Lexer` -> `Parser` -> `ScriptNode` -> expansion -> executor.

pub mod types;

pub use types::*;
