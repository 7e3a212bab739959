//! Configuration compilation and activation engine.
//!
//! A directive stream is parsed into a staged [`ConfigRecord`] through a
//! registry of typed directive handlers, validated, and swapped in as the
//! active record. A load that parses nothing usable still yields an
//! emergency configuration.

// Core
pub mod config;
pub mod directive;
pub mod error;
pub mod lifecycle;
pub mod ruleset;

// Collaborators
pub mod modules;
pub mod process;
pub mod rules;
pub mod source;

// Cross-cutting concerns
pub mod observability;

pub use config::schema::ConfigRecord;
pub use config::{load_config, load_from_str, EngineSettings, LoadOutcome, LoadReport};
pub use directive::{DirectiveRegistry, Handler, Scope};
pub use error::{ConfError, ConfResult};
pub use lifecycle::{ActiveCandidate, Collaborators, ConfigManager, StagedConfig};
