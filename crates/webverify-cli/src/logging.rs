//! tracing subscriber setup

use crate::commands::LogFormat;
use crate::config::Verbosity;
use crate::error::{CliError, CliResult};
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, else our crates at the verbosity's level
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = verbosity.log_level();
        EnvFilter::new(format!("warn,webverify={level},webverify_cli={level}"))
    })
}

/// Install the global subscriber; logs go to stderr
pub fn init(verbosity: Verbosity, format: LogFormat) -> CliResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| CliError::config(format!("cannot install logger: {e}")))
}
