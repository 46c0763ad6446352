//! Session error types.

use std::path::PathBuf;

/// Errors raised while creating, using or closing a [`crate::Session`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The directory that should hold the backing file is unusable.
    #[error("session directory {} is not usable: {source}", path.display())]
    TempDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A leftover backing file could not be removed before creation.
    #[error("could not remove stale backing file {}: {source}", path.display())]
    StaleFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The engine refused the session configuration.
    #[error("invalid engine setting '{setting}': {source}")]
    Configure {
        setting: &'static str,
        source: duckdb::Error,
    },

    /// The engine could not open the backing file.
    #[error("could not open session database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: duckdb::Error,
    },

    /// The spatial extension could not be installed or loaded.
    #[error("could not load spatial extension: {0}")]
    SpatialExtension(#[source] duckdb::Error),

    /// The session has already been closed.
    #[error("session {0} is closed")]
    Closed(String),

    /// Closing the connection failed; the session is considered closed anyway.
    #[error("failed to close session {id}: {reason}")]
    Close { id: String, reason: String },

    /// Query against the live session failed.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),
}

impl SessionError {
    /// Whether this error means no session could be created at all.
    #[must_use]
    pub const fn is_creation_failure(&self) -> bool {
        matches!(
            self,
            Self::TempDir { .. }
                | Self::StaleFile { .. }
                | Self::Configure { .. }
                | Self::Open { .. }
                | Self::SpatialExtension(_)
        )
    }
}
