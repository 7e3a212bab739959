//! Module loader backed by a table of statically linked modules.
//!
//! Every module is compiled in, so names resolve against the table only.
//! The `$ModDir` search directory is kept (and reported) but never
//! consulted when resolving a name.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::directive::DirectiveRegistry;
use crate::error::{ConfError, ConfResult};
use crate::modules::ModuleLoader;

/// Registers a module's directives.
pub type ModuleInit = fn(&DirectiveRegistry) -> ConfResult<()>;

#[derive(Debug, Default)]
struct LoaderState {
    search_dir: Option<PathBuf>,
    loaded: Vec<String>,
}

/// Resolves `$ModLoad` names against modules compiled into the binary.
#[derive(Default)]
pub struct StaticModuleLoader {
    modules: HashMap<String, ModuleInit>,
    state: Mutex<LoaderState>,
}

impl fmt::Debug for StaticModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut available: Vec<_> = self.modules.keys().collect();
        available.sort();
        f.debug_struct("StaticModuleLoader")
            .field("available", &available)
            .field("state", &self.state)
            .finish()
    }
}

/// `imuxsock.so`, `/usr/lib/rsyslog/imuxsock.so` and `imuxsock` all name
/// the same module.
fn module_key(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);
    base.strip_suffix(".so").unwrap_or(base).to_ascii_lowercase()
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a module available under `name`.
    pub fn with_module(mut self, name: &str, init: ModuleInit) -> Self {
        self.modules.insert(module_key(name), init);
        self
    }

    pub fn search_dir(&self) -> Option<PathBuf> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .search_dir
            .clone()
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn set_search_dir(&self, dir: &str) -> ConfResult<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.search_dir = Some(PathBuf::from(dir));
        debug!(dir, "module search directory set");
        Ok(())
    }

    fn load(&self, name: &str, registry: &DirectiveRegistry) -> ConfResult<()> {
        let key = module_key(name);
        let init = self.modules.get(&key).ok_or_else(|| ConfError::NotFound {
            what: "module",
            name: name.to_string(),
        })?;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.loaded.contains(&key) {
            debug!(module = %key, "module already loaded");
            return Ok(());
        }

        init(registry).map_err(|e| ConfError::Handler {
            directive: "modload".to_string(),
            message: format!("module '{key}' failed to initialize: {e}"),
            fatal: e.is_fatal(),
        })?;
        state.loaded.push(key.clone());
        info!(module = %key, search_dir = ?state.search_dir, "module loaded");
        Ok(())
    }

    fn loaded(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .loaded
            .clone()
    }
}
