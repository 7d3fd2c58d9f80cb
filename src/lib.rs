//! Formatter and lexical comparator for WS scripts.
//!
//! The lexer turns source text into a stream of classified tokens, the
//! formatter rewrites that stream in the canonical style, and the compare
//! module proves a reformatted file still carries the same significant
//! tokens as its original.

pub mod compare;
pub mod error;
pub mod formatter;
pub mod input;
pub mod lexer;
pub mod token;
