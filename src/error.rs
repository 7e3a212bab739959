//! Error definitions for configuration compilation and activation.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::validation::ValidationError;
use crate::directive::Scope;

/// Errors raised while registering, dispatching, loading or activating
/// configuration.
#[derive(Debug, Error)]
pub enum ConfError {
    /// A directive name was registered twice in the same scope.
    #[error("directive '{name}' is already registered in {scope} scope")]
    DuplicateName { name: String, scope: Scope },

    /// No handler is registered under the given name.
    #[error("invalid or yet-unknown config directive '${0}'")]
    UnknownDirective(String),

    /// The value literal could not be converted to the handler's kind.
    #[error("invalid value '{value}' for directive '${directive}': {reason}")]
    TypeConversion {
        directive: String,
        value: String,
        reason: String,
    },

    /// A referenced object (ruleset, module) does not exist.
    #[error("{what} '{name}' not found")]
    NotFound { what: &'static str, name: String },

    /// A handler signaled failure.
    #[error("directive '${directive}' failed: {message}")]
    Handler {
        directive: String,
        message: String,
        fatal: bool,
    },

    /// A load was requested while another one is still staged.
    #[error("a configuration load is already in progress")]
    AlreadyLoading,

    /// The OS rejected a resource limit change.
    #[error("could not set {resource} to {requested}: {message}")]
    ResourceLimit {
        resource: &'static str,
        requested: u64,
        message: String,
    },

    /// The text source contained a malformed statement.
    #[error("syntax error in {origin} line {line}: {message}")]
    Syntax {
        origin: String,
        line: usize,
        message: String,
    },

    /// The source parsed but configured no output action.
    #[error("there are no active actions configured; inputs will run, but no output whatsoever is created")]
    NoActions,

    /// The finished record failed semantic validation.
    #[error("configuration validation failed: {}", join_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error("could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings parse error: {0}")]
    Settings(#[from] toml::de::Error),
}

impl ConfError {
    /// Structural errors abort a load; everything else is reported and the
    /// load continues.
    pub fn is_fatal(&self) -> bool {
        match self {
            ConfError::AlreadyLoading | ConfError::DuplicateName { .. } => true,
            ConfError::Handler { fatal, .. } => *fatal,
            _ => false,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfError::DuplicateName { .. } => "duplicate_name",
            ConfError::UnknownDirective(_) => "unknown_directive",
            ConfError::TypeConversion { .. } => "type_conversion",
            ConfError::NotFound { .. } => "not_found",
            ConfError::Handler { .. } => "handler",
            ConfError::AlreadyLoading => "already_loading",
            ConfError::ResourceLimit { .. } => "resource_limit",
            ConfError::Syntax { .. } => "syntax",
            ConfError::NoActions => "no_actions",
            ConfError::Validation(_) => "validation",
            ConfError::Io { .. } => "io",
            ConfError::Settings(_) => "settings",
        }
    }

    pub(crate) fn conversion(directive: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfError::TypeConversion {
            directive: directive.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn handler(directive: &str, message: impl Into<String>) -> Self {
        ConfError::Handler {
            directive: directive.to_string(),
            message: message.into(),
            fatal: false,
        }
    }
}

fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for configuration operations.
pub type ConfResult<T> = Result<T, ConfError>;
