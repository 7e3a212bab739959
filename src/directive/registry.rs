//! Process-wide directive table.
//!
//! # Responsibilities
//! - Map lower-cased directive names to handler descriptors
//! - Reject duplicate names within a scope
//! - Dispatch a raw value to the bound handler
//!
//! # Design Decisions
//! - Exact, case-insensitive lookup; no prefix or wildcard matching
//! - Entries are shared (`Arc`) so a handler can register further
//!   directives (module loading) while it is running
//! - Registration order does not affect lookup

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::directive::handler::{Handler, HandlerKind};
use crate::error::{ConfError, ConfResult};
use crate::lifecycle::StagedConfig;

/// Where a directive applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Process-wide settings.
    Global,
    /// Settings local to the object currently being configured.
    Object,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.pad("global"),
            Scope::Object => f.pad("object"),
        }
    }
}

/// A registered directive.
#[derive(Debug)]
pub struct DirectiveEntry {
    name: String,
    scope: Scope,
    handler: Handler,
    once_only: bool,
    invocations: AtomicU64,
}

impl DirectiveEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn kind(&self) -> HandlerKind {
        self.handler.kind()
    }

    pub fn once_only(&self) -> bool {
        self.once_only
    }

    /// How often the directive has been dispatched since registration.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }
}

type DirectiveKey = (Scope, String);

/// Shared directive table. Cloning yields another handle to the same table.
#[derive(Clone, Default)]
pub struct DirectiveRegistry {
    entries: Arc<DashMap<DirectiveKey, Arc<DirectiveEntry>>>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` in `scope`.
    pub fn register(&self, name: &str, scope: Scope, handler: Handler, once_only: bool) -> ConfResult<()> {
        let name = name.to_ascii_lowercase();
        match self.entries.entry((scope, name.clone())) {
            Entry::Occupied(_) => Err(ConfError::DuplicateName { name, scope }),
            Entry::Vacant(slot) => {
                debug!(directive = %name, %scope, kind = %handler.kind(), "directive registered");
                slot.insert(Arc::new(DirectiveEntry {
                    name,
                    scope,
                    handler,
                    once_only,
                    invocations: AtomicU64::new(0),
                }));
                Ok(())
            }
        }
    }

    /// Remove a directive, e.g. when its module goes away.
    pub fn unregister(&self, name: &str, scope: Scope) -> bool {
        self.entries
            .remove(&(scope, name.to_ascii_lowercase()))
            .is_some()
    }

    pub fn lookup(&self, name: &str, scope: Scope) -> Option<Arc<DirectiveEntry>> {
        self.entries
            .get(&(scope, name.to_ascii_lowercase()))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Convert `raw` and apply it to the staged load through the handler
    /// registered for `name` in the global scope.
    pub fn dispatch(&self, staged: &mut StagedConfig, name: &str, raw: String) -> ConfResult<()> {
        let entry = self
            .lookup(name, Scope::Global)
            .ok_or_else(|| ConfError::UnknownDirective(name.to_string()))?;

        let previous = entry.invocations.fetch_add(1, Ordering::Relaxed);
        if entry.once_only && previous > 0 {
            debug!(directive = %entry.name, count = previous + 1, "once-only directive invoked again");
        }

        entry.handler.invoke(staged, &entry.name, raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries sorted by scope, then name.
    pub fn entries(&self) -> Vec<Arc<DirectiveEntry>> {
        let mut all: Vec<_> = self
            .entries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by(|a, b| (a.scope, &a.name).cmp(&(b.scope, &b.name)));
        all
    }
}

impl fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}
