//! Declarative SQL scripts.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use duckdb::Connection;

use crate::ScriptError;

/// An opened SQL script. The file handle is released when this is dropped,
/// whether or not [`SqlScript::execute`] ran or succeeded.
pub struct SqlScript {
    path: PathBuf,
    reader: BufReader<File>,
}

impl SqlScript {
    /// # Errors
    ///
    /// Returns [`ScriptError::OpenFailed`] if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, ScriptError> {
        let file = File::open(path).map_err(|source| ScriptError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }

    /// Run every statement in the file as one batch.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::ReadFailed`] if the content cannot be read and
    /// [`ScriptError::Sql`] for the first failing statement.
    pub fn execute(mut self, conn: &Connection) -> Result<(), ScriptError> {
        let mut sql = String::new();
        self.reader
            .read_to_string(&mut sql)
            .map_err(|source| ScriptError::ReadFailed {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), bytes = sql.len(), "executing sql script");
        conn.execute_batch(&sql).map_err(|source| ScriptError::Sql {
            path: self.path,
            source,
        })
    }
}
