//! # orbis-script
//!
//! Runs one script file against a live [`orbis_session::Session`].
//!
//! A [`ScriptMode`] is chosen up front from the two mutually exclusive file
//! options. Declarative SQL scripts go through the engine's batch runner;
//! general-purpose scripts are evaluated by an embedded Rhai interpreter that
//! sees the console as `out` and the session connection as `db`. Both modes
//! print the same `Started at` / `Finished at ..., elapsed = N seconds`
//! summary and never time out on their own.

pub mod error;
pub mod interpreter;
pub mod job;
pub mod mode;
pub mod sql;

pub use error::ScriptError;
pub use job::{run, started_line, ScriptReport};
pub use mode::ScriptMode;
