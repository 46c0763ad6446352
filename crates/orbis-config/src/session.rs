//! Ephemeral session configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_file_prefix() -> String {
    String::from("orbis")
}

fn default_file_extension() -> String {
    String::from("duckdb")
}

const fn default_threads() -> u32 {
    1
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Directory for backing files. Empty means the host temp directory.
    #[serde(default)]
    pub temp_dir: String,

    /// Backing file name prefix (`<prefix>_<millis>.<ext>`).
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Backing file extension, without the dot.
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Engine worker threads. One keeps the session single-writer.
    #[serde(default = "default_threads")]
    pub threads: u32,

    /// Load the spatial extension when the session is created.
    #[serde(default = "default_true")]
    pub load_spatial: bool,

    /// Run `INSTALL spatial` before loading it.
    #[serde(default = "default_true")]
    pub install_spatial: bool,

    /// Delete the backing file after the session is closed.
    #[serde(default)]
    pub remove_on_close: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            temp_dir: String::new(),
            file_prefix: default_file_prefix(),
            file_extension: default_file_extension(),
            threads: default_threads(),
            load_spatial: true,
            install_spatial: true,
            remove_on_close: false,
        }
    }
}

impl SessionConfig {
    /// Directory backing files are created in.
    #[must_use]
    pub fn resolved_temp_dir(&self) -> PathBuf {
        if self.temp_dir.is_empty() {
            std::env::temp_dir()
        } else {
            PathBuf::from(&self.temp_dir)
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.file_prefix.trim().is_empty() {
            return Err(invalid("session.file_prefix", "must not be empty"));
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err(invalid(
                "session.file_prefix",
                "must not contain path separators",
            ));
        }
        if self.file_extension.trim().is_empty() {
            return Err(invalid("session.file_extension", "must not be empty"));
        }
        if self.threads == 0 {
            return Err(invalid("session.threads", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
