//! Error types for fs-journal.
//!
//! All operations return `Result<T>` which aliases `Result<T, JournalError>`.

use thiserror::Error;

/// Errors from journaled filesystem operations.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Operation invoked in the wrong session state.
    ///
    /// Mutating calls need an active session; `start` needs none.
    #[error("Invalid session state: {0}")]
    SessionState(String),

    /// Replaying the undo log stopped part-way.
    ///
    /// The failed entry and everything older are still on the log, and the
    /// session directory holding their snapshots is left in place.
    #[error("Rollback failed with {remaining} entries unapplied: {source}")]
    RollbackFailed {
        remaining: usize,
        #[source]
        source: Box<JournalError>,
    },

    /// Plan file is structurally invalid.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// File system operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Glob pattern could not be compiled.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// TOML parse error in a plan file.
    #[error("TOML error: {0}")]
    Toml(#[from] toml_edit::TomlError),

    /// Unexpected error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JournalError {
    pub(crate) fn session(msg: impl Into<String>) -> Self {
        JournalError::SessionState(msg.into())
    }
}

/// Result type alias for fs-journal operations.
pub type Result<T> = std::result::Result<T, JournalError>;
