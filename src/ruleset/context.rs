//! Tracking of the "current" ruleset during a load.

use tracing::debug;

use crate::error::{ConfError, ConfResult};
use crate::ruleset::{Ruleset, RulesetCollection, DEFAULT_RULESET_NAME};

/// Which ruleset subsequent rule lines attach to.
///
/// Scoped to one load; the record only keeps the collection itself.
#[derive(Debug, Clone)]
pub struct RulesetContext {
    current: String,
}

impl RulesetContext {
    pub fn new() -> Self {
        Self {
            current: DEFAULT_RULESET_NAME.to_string(),
        }
    }

    pub fn current_name(&self) -> &str {
        &self.current
    }

    /// Make `name` current, constructing and finalizing it if it does not
    /// exist yet.
    pub fn set_current(&mut self, rulesets: &mut RulesetCollection, name: &str) -> ConfResult<()> {
        if !rulesets.contains(name) {
            debug!(ruleset = %name, "begin new current rule set");
            let mut ruleset = Ruleset::new(name);
            ruleset.finalize();
            rulesets.insert(ruleset)?;
        }
        self.current = name.to_string();
        Ok(())
    }

    /// Designate an existing ruleset as the default.
    pub fn set_default(&self, rulesets: &mut RulesetCollection, name: &str) -> ConfResult<()> {
        rulesets.set_default(name)?;
        debug!(ruleset = %name, "default rule set switched");
        Ok(())
    }

    /// The current ruleset inside `rulesets`.
    pub fn current_mut<'a>(&self, rulesets: &'a mut RulesetCollection) -> ConfResult<&'a mut Ruleset> {
        rulesets.get_mut(&self.current).ok_or_else(|| ConfError::NotFound {
            what: "ruleset",
            name: self.current.clone(),
        })
    }
}

impl Default for RulesetContext {
    fn default() -> Self {
        Self::new()
    }
}
