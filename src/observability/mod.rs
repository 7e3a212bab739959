//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Loads and directive handlers produce:
//!     → logging.rs (structured log events, tagged with load_id)
//!     → metrics.rs (load / error / fallback / activation counters)
//!     → diagnostics.rs (human-readable dump of a record)
//! ```
//!
//! # Design Decisions
//! - Operator-facing configuration errors are log events, not panics
//! - Metrics are cheap counters; no exporter is installed here
//! - The diagnostic dump is write-only: nothing reads it back

pub mod diagnostics;
pub mod logging;
pub mod metrics;
