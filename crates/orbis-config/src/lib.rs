//! # orbis-config
//!
//! Layered configuration loading for orbis using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`ORBIS_*` prefix, `__` as separator)
//! 2. An explicit file passed with `--config`
//! 3. Project-level `./orbis.toml`
//! 4. User-level `~/.config/orbis/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `ORBIS_SESSION__TEMP_DIR` -> `session.temp_dir`,
//! `ORBIS_SCRIPT__MAX_OPERATIONS` -> `script.max_operations`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use orbis_config::OrbisConfig;
//!
//! let config = OrbisConfig::load_with_dotenv(None).expect("config");
//! println!("backing files go to {}", config.session.resolved_temp_dir().display());
//! ```

mod error;
mod script;
mod session;

pub use error::ConfigError;
pub use script::ScriptConfig;
pub use session::SessionConfig;

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Project-local config file name, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "orbis.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrbisConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub script: ScriptConfig,
}

impl OrbisConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] on malformed sources and
    /// [`ConfigError::InvalidValue`] when a value fails validation.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit
            && !path.is_file()
        {
            return Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let config: Self = Self::figment(explicit).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env` from the working directory, then [`Self::load`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load(explicit)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    #[must_use]
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(PROJECT_CONFIG_FILE);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("ORBIS_").split("__"))
    }

    /// Reject values no session or script could run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("orbis").join("config.toml"))
    }
}
