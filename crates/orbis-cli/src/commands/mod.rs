use orbis_config::OrbisConfig;
use orbis_core::Console;
use orbis_session::Session;

use crate::cli::OutputFormat;

pub mod describe;
pub mod dispatch;
pub mod root;
pub mod script;

/// What every command gets to work with, besides the session.
pub struct CommandContext<'a> {
    pub console: &'a Console,
    pub config: &'a OrbisConfig,
    pub format: OutputFormat,
}

/// A command that needs the invocation's session.
///
/// The dispatcher creates the session and lends it for the duration of
/// [`SessionConsumer::run`]; implementors never open or close one themselves.
pub trait SessionConsumer {
    fn run(&self, session: &Session, ctx: &CommandContext<'_>) -> anyhow::Result<()>;
}
