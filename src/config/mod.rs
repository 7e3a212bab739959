//! Configuration record, its validation and the loading pipeline.
//!
//! # Data Flow
//! ```text
//! directive file
//!     → loader.rs (parse, dispatch, includes, fallback)
//!     → validation.rs (semantic checks)
//!     → ConfigRecord (validated, immutable once activated)
//!     → shared via Arc to readers
//!
//! On reload (SIGHUP or file change):
//!     watcher.rs detects change
//!     → loader.rs runs a fresh load
//!     → atomic swap of the active record
//! ```
//!
//! # Design Decisions
//! - A record is immutable once activated; changes require a full reload
//! - Every tunable has a built-in default
//! - Validation reports all problems at once

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_from_str, LoadOutcome, LoadReport};
pub use schema::{ConfigRecord, Globals, QueueTuning, QueueType};
pub use settings::{load_settings, EngineSettings};
