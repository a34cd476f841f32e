//! webverify CLI library
//!
//! Argument parsing, config layering, progress output and subcommand
//! handlers for the `webverify` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    BrowserArgs, CleanupArgs, Cli, ColorArg, Commands, ConfigArgs, LogFormat, ReportFormat,
    RunArgs, ValidateArgs,
};
pub use config::{
    apply_browser_args, apply_run_args, load_verify_config, CliConfig, ColorChoice, Verbosity,
};
pub use error::{CliError, CliResult};
pub use handlers::{execute, list_scenarios, select_scenarios};
pub use output::{render_report, ProgressReporter};
