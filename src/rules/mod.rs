//! Rule compilation.
//!
//! The engine does not interpret rules; it hands rule lines and
//! definition lines ($template, $outchannel, $AllowedSender) to a
//! [`RuleCompiler`] and counts the output actions it produces.

pub mod compiler;

use std::fmt;

use serde::Serialize;

use crate::config::schema::ConfigRecord;
use crate::error::ConfResult;
use crate::ruleset::Ruleset;

pub use compiler::SelectorCompiler;

/// Kind of definition line handed to the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NameLineKind {
    Template,
    OutputChannel,
    AllowedSender,
}

impl fmt::Display for NameLineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameLineKind::Template => f.write_str("template"),
            NameLineKind::OutputChannel => f.write_str("outchannel"),
            NameLineKind::AllowedSender => f.write_str("allowedsender"),
        }
    }
}

/// Compiles rule text into rulesets.
pub trait RuleCompiler: Send + Sync {
    /// Compile `line` and append the result to `ruleset`.
    ///
    /// Returns the number of output actions the line added.
    fn compile_rule(&self, ruleset: &mut Ruleset, line: &str) -> ConfResult<usize>;

    /// Compile a definition line and store it on the record.
    fn compile_name_line(&self, record: &mut ConfigRecord, kind: NameLineKind, line: &str) -> ConfResult<()>;
}
