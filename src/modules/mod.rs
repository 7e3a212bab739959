//! Module loading.
//!
//! # Responsibilities
//! - Resolve a module name given to `$ModLoad`
//! - Let the module register its own directives before later lines parse
//! - Honor the search directory set by `$ModDir`
//!
//! # Design Decisions
//! - Loading is synchronous and happens during the parse
//! - Loading an already loaded module is a no-op

pub mod loader;

use crate::directive::DirectiveRegistry;
use crate::error::ConfResult;

pub use loader::{ModuleInit, StaticModuleLoader};

/// Loads modules on behalf of `$ModLoad`.
pub trait ModuleLoader: Send + Sync {
    /// Change where modules are searched. Applies immediately; loaders
    /// without on-disk modules only record it.
    fn set_search_dir(&self, dir: &str) -> ConfResult<()>;

    /// Load `name` and let it register its directives.
    fn load(&self, name: &str, registry: &DirectiveRegistry) -> ConfResult<()>;

    /// Names of loaded modules, in load order.
    fn loaded(&self) -> Vec<String>;
}
