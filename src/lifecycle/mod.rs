//! Configuration lifecycle.
//!
//! # Data Flow
//! ```text
//! begin_load ──▶ StagedConfig ──(directives, rules)──▶ finalize_load
//!     │                                                    │
//!     │ AlreadyLoading if a load is staged                 ▼ validate
//!     │                                             ActiveCandidate
//!     │                                                    │
//!     └──────────────── slot released ◀──── activate (atomic swap)
//!
//! Signals (signals.rs):
//!     SIGHUP → run a new load and activate it
//!     SIGTERM/SIGINT → stop
//! ```
//!
//! # Design Decisions
//! - Staged and active records are separate types; only a finalized record
//!   can be activated
//! - Activation has no rollback; the previous record lives as long as a
//!   reader holds it
//! - The fallback is always compiled in and always tested

pub mod fallback;
pub mod manager;
pub mod signals;
pub mod staged;

pub use fallback::{build_fallback, fallback_rules, FallbackReport};
pub use manager::{ActiveCandidate, Collaborators, ConfigManager};
pub use signals::{SignalEvent, Signals};
pub use staged::StagedConfig;
