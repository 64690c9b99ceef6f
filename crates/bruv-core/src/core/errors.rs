//! Typed error types for the bruv-core service layer.

use thiserror::Error;

/// Result type alias for core service operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the bruv-core service layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The configuration file or a file it points at is missing or invalid.
    #[error("Configuration error in {path}: {reason}")]
    Config { path: String, reason: String },

    /// Gerrit rejected the query or the connection failed.
    #[error("Gerrit query failed: {message}")]
    Query { message: String },

    /// A saved query name was requested that is not configured.
    #[error("Unknown saved query: {name}\n  To fix: bruv queries")]
    UnknownQuery { name: String },

    /// A change number could not be canonicalized.
    #[error("Invalid change number: '{input}'")]
    InvalidChangeNumber { input: String },

    /// A filter expression could not be parsed.
    #[error("Invalid filter expression: {message}")]
    Filter { message: String },

    /// The read-state database failed.
    #[error("Read-state store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The read-state database holds data this version cannot read.
    #[error("Read-state store is unreadable: {detail}")]
    StoreCorrupt { detail: String },

    /// An internal error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// Whether an interactive session may report this error and keep going.
    ///
    /// Configuration and store failures leave the process without a usable
    /// setup, so they always abort.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Query { .. }
                | Self::UnknownQuery { .. }
                | Self::InvalidChangeNumber { .. }
                | Self::Filter { .. }
        )
    }

    pub(crate) fn config(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}
