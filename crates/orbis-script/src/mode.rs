use std::fmt;
use std::path::{Path, PathBuf};

use crate::ScriptError;

/// Which runner a script file goes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptMode {
    /// Statements executed by the engine's own script runner.
    DeclarativeQuery(PathBuf),
    /// A Rhai program with `out` and `db` bindings.
    GeneralScript(PathBuf),
}

impl ScriptMode {
    /// Pick the mode from the two mutually exclusive file options.
    ///
    /// `Ok(None)` means there is nothing to run.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::ModeConflict`] when both options are set.
    pub fn from_options(
        sql: Option<PathBuf>,
        script: Option<PathBuf>,
    ) -> Result<Option<Self>, ScriptError> {
        match (sql, script) {
            (Some(_), Some(_)) => Err(ScriptError::ModeConflict),
            (Some(path), None) => Ok(Some(Self::DeclarativeQuery(path))),
            (None, Some(path)) => Ok(Some(Self::GeneralScript(path))),
            (None, None) => Ok(None),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::DeclarativeQuery(path) | Self::GeneralScript(path) => path,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DeclarativeQuery(_) => "sql",
            Self::GeneralScript(_) => "rhai",
        }
    }
}

impl fmt::Display for ScriptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} script {}", self.label(), self.path().display())
    }
}
