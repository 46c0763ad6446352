#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

use std::process::ExitCode;

use anyhow::Context;
use orbis_config::OrbisConfig;
use orbis_core::Console;

mod cli;
mod commands;
mod output;

fn main() -> ExitCode {
    let started_at = orbis_core::process_start_millis();
    match run(started_at) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("orbis error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(started_at: i64) -> anyhow::Result<ExitCode> {
    let console = Console::stdio();

    let invocation = match commands::dispatch::resolve(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(usage) => return Ok(ExitCode::from(usage.report(&console))),
    };

    init_tracing(invocation.flags.quiet, invocation.flags.verbose)?;

    let config = OrbisConfig::load_with_dotenv(invocation.flags.config.as_deref())
        .context("failed to load orbis configuration")?;

    let dispatcher = commands::dispatch::Dispatcher::new(&config, console, started_at);
    let report = dispatcher.execute(&invocation);
    Ok(report.exit_code())
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("ORBIS_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
