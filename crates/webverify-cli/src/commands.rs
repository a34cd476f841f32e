//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// webverify: post-deployment browser verification
#[derive(Parser, Debug)]
#[command(name = "webverify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, value_enum, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Configuration file (default: ./webverify.yaml if present)
    #[arg(long, env = "WEBVERIFY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Deployment under test
    #[arg(long, env = "WEBVERIFY_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List built-in scenarios
    List,

    /// Run verification scenarios
    Run(RunArgs),

    /// Delete a scenario's leftover test records
    Cleanup(CleanupArgs),

    /// Parse and validate scenario files
    Validate(ValidateArgs),

    /// Show effective configuration
    Config(ConfigArgs),
}

/// Browser launch flags shared by `run` and `cleanup`
#[derive(Args, Debug, Clone, Default)]
pub struct BrowserArgs {
    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Path to the chromium binary
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Disable the chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the run command
#[derive(Args, Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Built-in scenarios to run
    pub names: Vec<String>,

    /// Run every built-in scenario
    #[arg(long)]
    pub all: bool,

    /// Scenario file(s) to run (YAML)
    #[arg(short, long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Browser flags
    #[command(flatten)]
    pub browser: BrowserArgs,

    /// Default postcondition timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Poll interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval: Option<u64>,

    /// Directory for screenshots and failure sidecars
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Keep artifacts from earlier runs (timestamped names)
    #[arg(long)]
    pub accumulate_artifacts: bool,

    /// Report format on stdout
    #[arg(long, value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Treat incomplete cleanup as a failure
    #[arg(long)]
    pub strict_cleanup: bool,
}

/// Arguments for the cleanup command
#[derive(Args, Debug, Clone)]
pub struct CleanupArgs {
    /// Built-in scenario whose cleanup to run
    #[arg(required_unless_present = "file")]
    pub name: Option<String>,

    /// Scenario file whose cleanup to run
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Browser flags
    #[command(flatten)]
    pub browser: BrowserArgs,
}

/// Arguments for the validate command
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Scenario files
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

/// Arguments for the config command
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Print built-in defaults, ignoring files and flags
    #[arg(long)]
    pub defaults: bool,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Run report format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Summary table
    #[default]
    Text,
    /// Full run report as JSON
    Json,
}
