//! Directive source text.
//!
//! Tokenizing belongs to the text source; the engine only consumes the
//! statements it yields in source order.

pub mod parser;

pub use parser::{parse_statements, Statement};
