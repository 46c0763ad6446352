//! Resolve argv to commands and run them around one lazily created session.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use orbis_config::OrbisConfig;
use orbis_core::Console;
use orbis_session::{Session, SessionError};

use crate::cli::{Cli, Commands, GlobalFlags, OutputFormat, normalize_legacy_flags};
use crate::commands::describe::DescribeCommand;
use crate::commands::root::RootCommand;
use crate::commands::script::ScriptCommand;
use crate::commands::{CommandContext, SessionConsumer};

/// One resolved command object.
#[derive(Clone, Debug)]
pub enum ResolvedCommand {
    Root(RootCommand),
    Describe(DescribeCommand),
    Script(ScriptCommand),
}

impl ResolvedCommand {
    #[must_use]
    pub const fn requires_session(&self) -> bool {
        matches!(self, Self::Describe(_) | Self::Script(_))
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Root(_) => "orbis",
            Self::Describe(_) => "describe",
            Self::Script(_) => "script",
        }
    }
}

/// Parsed invocation: the root command, then at most one subcommand.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub flags: GlobalFlags,
    commands: Vec<ResolvedCommand>,
}

impl Invocation {
    fn from_cli(cli: &Cli) -> Self {
        let mut commands = vec![ResolvedCommand::Root(RootCommand {
            show_info: cli.version,
        })];
        match &cli.command {
            Some(Commands::Describe(args)) => {
                commands.push(ResolvedCommand::Describe(DescribeCommand::from(args)));
            }
            Some(Commands::Script(args)) => {
                commands.push(ResolvedCommand::Script(ScriptCommand::from(args)));
            }
            None => {}
        }
        Self {
            flags: cli.global_flags(),
            commands,
        }
    }

    #[must_use]
    pub fn commands(&self) -> &[ResolvedCommand] {
        &self.commands
    }
}

/// Malformed or unknown arguments, or an explicit `--help`.
#[derive(Debug)]
pub struct UsageError {
    error: clap::Error,
}

impl UsageError {
    /// `--help` style results that should go to stdout with success.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        matches!(
            self.error.kind(),
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
        )
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.error.render().to_string()
    }

    #[must_use]
    pub fn usage() -> String {
        Cli::command().render_help().to_string()
    }

    /// Print the message (and the full usage for real errors) and return the
    /// process exit status.
    pub fn report(&self, console: &Console) -> u8 {
        if self.is_informational() {
            let _ = console.println(self.message().trim_end());
            return 0;
        }
        let _ = console.eprintln(self.message().trim_end());
        let _ = console.eprintln("");
        let _ = console.eprintln(Self::usage().trim_end());
        u8::try_from(self.error.exit_code()).unwrap_or(2)
    }
}

impl From<clap::Error> for UsageError {
    fn from(error: clap::Error) -> Self {
        Self { error }
    }
}

/// Parse process arguments. Never creates a session.
///
/// # Errors
///
/// Returns [`UsageError`] when clap rejects the arguments or help was requested.
pub fn resolve<I, T>(args: I) -> Result<Invocation, UsageError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let cli = Cli::try_parse_from(normalize_legacy_flags(args))?;
    Ok(Invocation::from_cli(&cli))
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExitStatus {
    #[default]
    Success,
    Failure,
}

/// What happened during one [`Dispatcher::execute`].
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub status: ExitStatus,
    pub sessions_opened: u32,
    pub sessions_closed: u32,
    pub backing_file: Option<PathBuf>,
}

impl DispatchReport {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self.status {
            ExitStatus::Success => ExitCode::SUCCESS,
            ExitStatus::Failure => ExitCode::FAILURE,
        }
    }
}

/// One unit of work for the dispatcher loop.
enum Step<'c> {
    Root(&'c RootCommand),
    Consume(&'static str, &'c dyn SessionConsumer),
}

impl Step<'_> {
    const fn name(&self) -> &'static str {
        match self {
            Self::Root(_) => "orbis",
            Self::Consume(name, _) => *name,
        }
    }
}

/// Runs an [`Invocation`] and owns its session from creation to close.
pub struct Dispatcher<'a> {
    config: &'a OrbisConfig,
    console: Console,
    started_at_millis: i64,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub const fn new(config: &'a OrbisConfig, console: Console, started_at_millis: i64) -> Self {
        Self {
            config,
            console,
            started_at_millis,
        }
    }

    /// Run every resolved command in order.
    ///
    /// The session is created the first time a command needs it and closed
    /// exactly once afterwards, whatever the commands returned. A session that
    /// cannot be created aborts the remaining commands.
    pub fn execute(&self, invocation: &Invocation) -> DispatchReport {
        let steps = invocation.commands().iter().map(|command| match command {
            ResolvedCommand::Root(root) => Step::Root(root),
            ResolvedCommand::Describe(describe) => Step::Consume(command.name(), describe),
            ResolvedCommand::Script(script) => Step::Consume(command.name(), script),
        });
        self.run_steps(steps, invocation.flags.format)
    }

    fn run_steps<'c>(
        &self,
        steps: impl IntoIterator<Item = Step<'c>>,
        format: OutputFormat,
    ) -> DispatchReport {
        let ctx = CommandContext {
            console: &self.console,
            config: self.config,
            format,
        };
        let mut report = DispatchReport::default();
        let mut session: Option<Session> = None;

        for step in steps {
            tracing::debug!(
                command = step.name(),
                requires_session = matches!(step, Step::Consume(..)),
                "running command"
            );
            let attempt = match step {
                Step::Root(root) => Ok(root.run(&ctx)),
                Step::Consume(_, consumer) => {
                    self.with_session(consumer, &mut session, &mut report, &ctx)
                }
            };

            let outcome = match attempt {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::error!(%error, "session creation failed");
                    let _ = self
                        .console
                        .eprintln(format!("orbis: session creation failed: {error}"));
                    report.status = ExitStatus::Failure;
                    break;
                }
            };

            if let Err(error) = outcome {
                tracing::error!(error = %format!("{error:#}"), "command failed");
                let _ = self.console.eprintln(format!("orbis: {error:#}"));
                report.status = ExitStatus::Failure;
            }
        }

        if let Some(mut live) = session.take() {
            if let Err(error) = live.close() {
                tracing::warn!(%error, "session cleanup failed");
                let _ = self.console.eprintln(format!("orbis: warning: {error}"));
            }
            report.sessions_closed += 1;
        }

        report
    }

    /// Inject the session into `consumer`, creating it on first use.
    /// The outer error means no session exists and nothing ran.
    fn with_session(
        &self,
        consumer: &dyn SessionConsumer,
        slot: &mut Option<Session>,
        report: &mut DispatchReport,
        ctx: &CommandContext<'_>,
    ) -> Result<anyhow::Result<()>, SessionError> {
        let live = self.attach(slot, report)?;
        Ok(consumer.run(live, ctx))
    }

    fn attach<'s>(
        &self,
        slot: &'s mut Option<Session>,
        report: &mut DispatchReport,
    ) -> Result<&'s Session, SessionError> {
        let session = match slot.take() {
            Some(session) => session,
            None => {
                let session = Session::create(&self.config.session, self.started_at_millis)?;
                report.sessions_opened += 1;
                report.backing_file = Some(session.backing_path().to_path_buf());
                session
            }
        };
        Ok(slot.insert(session))
    }
}
