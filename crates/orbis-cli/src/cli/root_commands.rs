use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Subcommands. At most one runs per invocation.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Report metadata about an input file using a live session.
    Describe(DescribeArgs),
    /// Run a SQL or Rhai script against a fresh session.
    Script(ScriptArgs),
}

/// Arguments for `orbis describe`.
#[derive(Clone, Debug, Args)]
pub struct DescribeArgs {
    /// File to describe.
    #[arg(
        long = "sourceFile",
        visible_alias = "sourcefile",
        value_name = "PATH",
        allow_hyphen_values = true
    )]
    pub source_file: Option<PathBuf>,
}

/// Arguments for `orbis script`.
///
/// `--sql` and `--script` are mutually exclusive; the conflict is reported at
/// run time rather than rejected by the parser.
#[derive(Clone, Debug, Args)]
pub struct ScriptArgs {
    /// SQL script executed statement by statement.
    #[arg(long, value_name = "PATH", allow_hyphen_values = true)]
    pub sql: Option<PathBuf>,
    /// Rhai script with `out` and `db` bindings.
    #[arg(short = 'g', long = "script", value_name = "PATH", allow_hyphen_values = true)]
    pub script: Option<PathBuf>,
}
