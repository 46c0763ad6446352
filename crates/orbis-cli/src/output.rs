use std::fmt::Display;

use orbis_core::Console;
use serde::Serialize;

use crate::cli::OutputFormat;

/// Render a response as human-readable text or pretty JSON.
pub fn render<T: Serialize + Display>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(value.to_string()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
    }
}

/// Print a response on the console's standard output.
pub fn output<T: Serialize + Display>(
    value: &T,
    format: OutputFormat,
    console: &Console,
) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    console.println(rendered)?;
    Ok(())
}
