//! Settings of the engine itself (not the directive file it loads).
//!
//! ```toml
//! config_file = "/etc/rsyslog.conf"
//! log_level = "info"
//! watch = true
//! watch_poll_secs = 2
//! dump_on_activate = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfError, ConfResult};

/// Engine settings. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Directive file to load.
    pub config_file: PathBuf,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Reload when the directive file changes.
    pub watch: bool,
    /// Poll interval for watcher backends that poll.
    pub watch_poll_secs: u64,
    /// Dump the record to the diagnostic sink after each activation.
    pub dump_on_activate: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("/etc/rsyslog.conf"),
            log_level: "info".to_string(),
            watch: false,
            watch_poll_secs: 2,
            dump_on_activate: false,
        }
    }
}

/// Read settings from a TOML file.
pub fn load_settings(path: &Path) -> ConfResult<EngineSettings> {
    let content = fs::read_to_string(path).map_err(|source| ConfError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}
