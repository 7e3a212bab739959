//! Line-oriented legacy directive syntax.
//!
//! ```text
//! # comment
//! $MainMsgQueueSize 50000      → Statement::Directive
//! $ResetConfigVariables        → Statement::Directive (empty value)
//! *.err   /dev/console         → Statement::Rule
//! ```

use crate::error::ConfError;

/// One statement of the source, tagged with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Directive {
        name: String,
        value: String,
        line: usize,
    },
    Rule {
        text: String,
        line: usize,
    },
}

/// Split `text` into statements. Malformed lines become `Syntax` errors in
/// place so the caller can report them and keep going.
pub fn parse_statements(text: &str, origin: &str) -> Vec<Result<Statement, ConfError>> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }

            let Some(rest) = trimmed.strip_prefix('$') else {
                return Some(Ok(Statement::Rule {
                    text: trimmed.to_string(),
                    line,
                }));
            };

            let (name, value) = match rest.split_once(char::is_whitespace) {
                Some((name, value)) => (name, value.trim()),
                None => (rest, ""),
            };
            if name.is_empty() {
                return Some(Err(ConfError::Syntax {
                    origin: origin.to_string(),
                    line,
                    message: "'$' must be followed by a directive name".to_string(),
                }));
            }

            Some(Ok(Statement::Directive {
                name: name.to_string(),
                value: value.to_string(),
                line,
            }))
        })
        .collect()
}
