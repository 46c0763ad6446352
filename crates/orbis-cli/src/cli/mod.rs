use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::{Commands, DescribeArgs, ScriptArgs};

/// Single-dash long options accepted for compatibility.
const LEGACY_LONG_FLAGS: &[&str] = &["-version", "-sourceFile", "-sourcefile", "-sql"];

/// Options whose value may arrive as the next argument.
const VALUE_FLAGS: &[&str] = &[
    "--config",
    "--format",
    "--sourceFile",
    "--sourcefile",
    "--sql",
    "--script",
    "-g",
];

/// Top-level CLI parser for the `orbis` binary.
#[derive(Debug, Parser)]
#[command(
    name = "orbis",
    version,
    disable_version_flag = true,
    about = "orbis - throwaway spatial database sessions for SQL and Rhai scripts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Print tool and runtime information
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// Quiet mode (errors only in logs)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Extra TOML config file, layered above orbis.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format: text, json
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            config: self.config.clone(),
        }
    }
}

/// Rewrite `-sql x` style options to `--sql x` so clap accepts them.
///
/// Only the exact legacy spellings (optionally with `=value`) in option
/// position are touched. The argument following an option that takes a value
/// is left alone, as is everything after a bare `--`.
pub fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    let mut value_pending = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough || std::mem::take(&mut value_pending) {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            let (name, inline_value) = text
                .split_once('=')
                .map_or((text, false), |(name, _)| (name, true));
            let rewritten = LEGACY_LONG_FLAGS.contains(&name);
            let name = if rewritten { format!("-{name}") } else { name.to_string() };
            value_pending = !inline_value && VALUE_FLAGS.contains(&name.as_str());
            if rewritten {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}
