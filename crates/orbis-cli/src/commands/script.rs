use orbis_script::{ScriptError, ScriptMode};
use orbis_session::Session;

use crate::cli::ScriptArgs;
use crate::commands::{CommandContext, SessionConsumer};

/// What `orbis script` will do, decided when the options are resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptPlan {
    Run(ScriptMode),
    /// Both `--sql` and `--script` were given.
    Conflict,
    /// Neither option was given.
    Nothing,
}

#[derive(Clone, Debug)]
pub struct ScriptCommand {
    pub plan: ScriptPlan,
}

impl From<&ScriptArgs> for ScriptCommand {
    fn from(args: &ScriptArgs) -> Self {
        let plan = match ScriptMode::from_options(args.sql.clone(), args.script.clone()) {
            Ok(Some(mode)) => ScriptPlan::Run(mode),
            Ok(None) => ScriptPlan::Nothing,
            Err(_) => ScriptPlan::Conflict,
        };
        Self { plan }
    }
}

impl SessionConsumer for ScriptCommand {
    /// Script failures are reported here and never propagated; the session is
    /// still closed by the dispatcher afterwards.
    fn run(&self, session: &Session, ctx: &CommandContext<'_>) -> anyhow::Result<()> {
        let mode = match &self.plan {
            ScriptPlan::Run(mode) => mode,
            ScriptPlan::Conflict => {
                tracing::warn!("script options conflict; nothing executed");
                ctx.console
                    .eprintln(format!("orbis: {}", ScriptError::ModeConflict))?;
                return Ok(());
            }
            ScriptPlan::Nothing => {
                tracing::info!("no script given; nothing to run");
                return Ok(());
            }
        };

        if let Err(error) = orbis_script::run(mode, session, ctx.console, &ctx.config.script) {
            tracing::error!(%error, "script job failed");
            ctx.console.eprintln(format!("orbis: {error}"))?;
        }
        Ok(())
    }
}
