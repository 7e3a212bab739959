//! Default selector/action rule compiler.

use tracing::debug;

use crate::config::schema::ConfigRecord;
use crate::error::{ConfError, ConfResult};
use crate::rules::{NameLineKind, RuleCompiler};
use crate::ruleset::{Rule, Ruleset};

/// Compiles classic `facility.priority<TAB>action` lines.
///
/// Several selectors may be joined with `;` and several facilities with
/// `,`. Each compiled line yields exactly one output action.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectorCompiler;

impl SelectorCompiler {
    pub fn new() -> Self {
        Self
    }
}

fn check_selector(selector: &str) -> Result<(), String> {
    for part in selector.split(';') {
        let (facilities, priority) = part
            .split_once('.')
            .ok_or_else(|| format!("selector '{part}' lacks a '.'"))?;
        if facilities.is_empty() || facilities.split(',').any(str::is_empty) {
            return Err(format!("selector '{part}' has an empty facility"));
        }
        let priority = priority.trim_start_matches(['!', '=']);
        if priority.is_empty() {
            return Err(format!("selector '{part}' has an empty priority"));
        }
    }
    Ok(())
}

impl RuleCompiler for SelectorCompiler {
    fn compile_rule(&self, ruleset: &mut Ruleset, line: &str) -> ConfResult<usize> {
        let line = line.trim();
        let (selector, action) = line
            .split_once(char::is_whitespace)
            .map(|(s, a)| (s, a.trim()))
            .ok_or_else(|| ConfError::handler("rule", format!("'{line}' has no action")))?;

        if action.is_empty() {
            return Err(ConfError::handler("rule", format!("'{line}' has no action")));
        }
        check_selector(selector).map_err(|reason| ConfError::handler("rule", reason))?;

        debug!(ruleset = %ruleset.name(), selector, action, "rule compiled");
        ruleset.push_rule(Rule {
            selector: selector.to_string(),
            action: action.to_string(),
        });
        Ok(1)
    }

    fn compile_name_line(&self, record: &mut ConfigRecord, kind: NameLineKind, line: &str) -> ConfResult<()> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ConfError::handler(&kind.to_string(), "a definition is required"));
        }
        let target = match kind {
            NameLineKind::Template => &mut record.templates,
            NameLineKind::OutputChannel => &mut record.output_channels,
            NameLineKind::AllowedSender => &mut record.allowed_senders,
        };
        target.push(line.to_string());
        Ok(())
    }
}
