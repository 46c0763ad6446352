//! Script job error types.

use std::path::PathBuf;

use orbis_session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Both a SQL script and a general-purpose script were requested.
    #[error("--sql and --script are mutually exclusive; pass only one")]
    ModeConflict,

    /// The script file is missing or cannot be opened.
    #[error("cannot open script {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The script file opened but its contents could not be read as text.
    #[error("cannot read script {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A statement in a SQL script failed.
    #[error("SQL script {} failed: {source}", path.display())]
    Sql {
        path: PathBuf,
        source: duckdb::Error,
    },

    /// The interpreter rejected or aborted a general-purpose script.
    #[error("script {} failed: {message}", path.display())]
    Eval { path: PathBuf, message: String },

    /// The session was not usable for this job.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Writing the timing summary failed.
    #[error("could not write script output: {0}")]
    Output(#[from] std::io::Error),
}

impl ScriptError {
    /// Whether the job started executing before it failed.
    #[must_use]
    pub const fn is_execution_failure(&self) -> bool {
        matches!(self, Self::Sql { .. } | Self::Eval { .. })
    }
}
