use std::fmt;

use serde::Serialize;

use crate::commands::CommandContext;
use crate::output::output;

/// The `orbis` command itself, with or without a subcommand.
#[derive(Clone, Debug)]
pub struct RootCommand {
    pub show_info: bool,
}

#[derive(Debug, Serialize)]
pub struct RuntimeInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
    pub engine: &'static str,
    pub scripting: &'static str,
}

impl RuntimeInfo {
    #[must_use]
    pub const fn current() -> Self {
        Self {
            name: "orbis",
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
            engine: "duckdb (bundled, spatial)",
            scripting: "rhai",
        }
    }
}

impl fmt::Display for RuntimeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "orbis {}", self.version)?;
        writeln!(f, "runtime: {} {} ({})", self.os, self.arch, self.family)?;
        write!(f, "engine: {}, scripting: {}", self.engine, self.scripting)
    }
}

impl RootCommand {
    pub fn run(&self, ctx: &CommandContext<'_>) -> anyhow::Result<()> {
        if !self.show_info {
            tracing::debug!("root command: nothing to report");
            return Ok(());
        }
        output(&RuntimeInfo::current(), ctx.format, ctx.console)
    }
}
