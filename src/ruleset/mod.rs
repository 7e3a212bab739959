//! Rulesets: named, ordered groups of match-and-act rules.
//!
//! # Data Flow
//! ```text
//! $Ruleset name     → context.rs (resolve or create, make current)
//! rule lines        → rule compiler → current Ruleset
//! $DefaultRuleset   → RulesetCollection::set_default (must exist)
//! ```
//!
//! # Design Decisions
//! - Names are case-insensitive and unique
//! - Iteration follows insertion order, not lexical order
//! - The default ruleset always exists once a record is constructed

pub mod context;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{ConfError, ConfResult};

pub use context::RulesetContext;

/// Name of the ruleset every record starts with.
pub const DEFAULT_RULESET_NAME: &str = "RSYSLOG_DefaultRuleset";

/// A compiled rule: selector plus action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub selector: String,
    pub action: String,
}

/// A named group of rules.
#[derive(Debug, Clone, Serialize)]
pub struct Ruleset {
    name: String,
    rules: Vec<Rule>,
    #[serde(skip)]
    finalized: bool,
}

impl Ruleset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            finalized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Mark construction complete; only finalized rulesets join a collection.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

/// Ordered, case-insensitive collection of rulesets.
#[derive(Debug, Clone, Serialize)]
pub struct RulesetCollection {
    entries: Vec<Ruleset>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    default: String,
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl RulesetCollection {
    /// Create a collection holding only the default ruleset.
    pub fn new() -> Self {
        let mut default = Ruleset::new(DEFAULT_RULESET_NAME);
        default.finalize();

        let mut index = HashMap::new();
        index.insert(key(DEFAULT_RULESET_NAME), 0);

        Self {
            entries: vec![default],
            index,
            default: DEFAULT_RULESET_NAME.to_string(),
        }
    }

    /// Add a finalized ruleset. Names must be unique (case-insensitive).
    pub fn insert(&mut self, ruleset: Ruleset) -> ConfResult<()> {
        if !ruleset.is_finalized() {
            return Err(ConfError::handler(
                "ruleset",
                format!("ruleset '{}' was not finalized", ruleset.name()),
            ));
        }
        let k = key(ruleset.name());
        if self.index.contains_key(&k) {
            return Err(ConfError::handler(
                "ruleset",
                format!("ruleset '{}' already exists", ruleset.name()),
            ));
        }
        self.index.insert(k, self.entries.len());
        self.entries.push(ruleset);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Ruleset> {
        self.index.get(&key(name)).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Ruleset> {
        match self.index.get(&key(name)) {
            Some(&i) => self.entries.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&key(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rulesets in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Ruleset> {
        self.entries.iter()
    }

    /// Name of the default ruleset as it was registered.
    pub fn default_name(&self) -> &str {
        &self.default
    }

    pub fn default_ruleset(&self) -> Option<&Ruleset> {
        self.get(&self.default)
    }

    /// Switch the default ruleset. The ruleset must already exist.
    pub fn set_default(&mut self, name: &str) -> ConfResult<()> {
        match self.get(name) {
            Some(rs) => {
                self.default = rs.name().to_string();
                Ok(())
            }
            None => Err(ConfError::NotFound {
                what: "ruleset",
                name: name.to_string(),
            }),
        }
    }

    /// Total number of rules across all rulesets.
    pub fn rule_count(&self) -> usize {
        self.entries.iter().map(|rs| rs.rules.len()).sum()
    }
}

impl Default for RulesetCollection {
    fn default() -> Self {
        Self::new()
    }
}
