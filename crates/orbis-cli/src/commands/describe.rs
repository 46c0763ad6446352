use std::fmt;
use std::path::PathBuf;

use anyhow::Context;
use orbis_session::Session;
use serde::Serialize;

use crate::cli::DescribeArgs;
use crate::commands::{CommandContext, SessionConsumer};
use crate::output::output;

/// `orbis describe`: identify the input and the session it would be read with.
#[derive(Clone, Debug)]
pub struct DescribeCommand {
    pub source_file: Option<PathBuf>,
}

impl From<&DescribeArgs> for DescribeCommand {
    fn from(args: &DescribeArgs) -> Self {
        Self {
            source_file: args.source_file.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DescribeResponse {
    pub source: Option<String>,
    pub session: String,
    pub backing_file: String,
    pub engine_version: String,
}

impl fmt::Display for DescribeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "source: {}", self.source.as_deref().unwrap_or("(none)"))?;
        writeln!(f, "session: {}", self.session)?;
        writeln!(f, "backing file: {}", self.backing_file)?;
        write!(f, "engine: {}", self.engine_version)
    }
}

impl SessionConsumer for DescribeCommand {
    fn run(&self, session: &Session, ctx: &CommandContext<'_>) -> anyhow::Result<()> {
        let engine_version = session
            .engine_version()
            .context("failed to query engine version")?;
        let response = DescribeResponse {
            source: self
                .source_file
                .as_ref()
                .map(|path| path.display().to_string()),
            session: session.id().to_string(),
            backing_file: session.backing_path().display().to_string(),
            engine_version,
        };
        output(&response, ctx.format, ctx.console)
    }
}
