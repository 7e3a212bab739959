//! Directive registry and dispatch.
//!
//! # Data Flow
//! ```text
//! text parser → ($name, raw value)
//!     → registry.rs (case-insensitive lookup)
//!     → handler.rs (type conversion by handler kind)
//!     → setter (mutates the staged record or ruleset context)
//! ```
//!
//! # Design Decisions
//! - Tagged handler kinds with typed setters instead of untyped targets
//! - Modules extend the table at load time through the same `register`
//! - Unknown directives and bad literals are recoverable errors

pub mod builtin;
pub mod handler;
pub mod registry;

pub use builtin::register_builtin_directives;
pub use handler::{Handler, HandlerKind, Setter};
pub use registry::{DirectiveEntry, DirectiveRegistry, Scope};
