//! CLI configuration and layering of flags over the config file

use crate::commands::{BrowserArgs, Cli, LogFormat, RunArgs};
use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use webverify::{ArtifactPolicy, VerifyConfig};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - failures only
    Quiet,
    /// Normal - progress lines
    #[default]
    Normal,
    /// Verbose - library info events
    Verbose,
    /// Debug - every poll and probe
    Debug,
}

impl Verbosity {
    /// From `-q` and the `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default `tracing` level when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_level(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stderr().features().colors_supported(),
        }
    }
}

/// Presentation settings derived from global flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Log line format
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// From the global flags
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self::new()
            .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
            .with_color(cli.color.into())
            .with_log_format(cli.log_format)
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set log format
    #[must_use]
    pub const fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }
}

// =============================================================================
// LAYERING
// =============================================================================

/// Config file (explicit, `./webverify.yaml`, or defaults) with `--base-url` on top
pub fn load_verify_config(cli: &Cli) -> CliResult<VerifyConfig> {
    let mut config = VerifyConfig::load_or_default(cli.config.as_deref())?;
    if let Some(ref url) = cli.base_url {
        config.base_url = url.trim_end_matches('/').to_string();
    }
    config.validate()?;
    Ok(config)
}

/// Apply browser flags
pub fn apply_browser_args(config: &mut VerifyConfig, args: &BrowserArgs) {
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(ref path) = args.chromium_path {
        config.browser.chromium_path = Some(path.clone());
    }
    if args.no_sandbox {
        config.browser.sandbox = false;
    }
}

/// Apply `run` flags
pub fn apply_run_args(config: &mut VerifyConfig, args: &RunArgs) -> CliResult<()> {
    apply_browser_args(config, &args.browser);
    if let Some(ms) = args.timeout {
        config.wait.timeout_ms = ms;
    }
    if let Some(ms) = args.poll_interval {
        config.wait.poll_interval_ms = ms;
    }
    if let Some(ref dir) = args.output_dir {
        config.diagnostics.output_dir.clone_from(dir);
    }
    if args.accumulate_artifacts {
        config.diagnostics.policy = ArtifactPolicy::Accumulate;
    }
    config
        .validate()
        .map_err(|e| CliError::invalid_argument(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
            assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(false, 2), Verbosity::Debug);
        }

        #[test]
        fn test_log_levels() {
            assert_eq!(Verbosity::Quiet.log_level(), "error");
            assert_eq!(Verbosity::Normal.log_level(), "warn");
            assert_eq!(Verbosity::Debug.log_level(), "debug");
            assert!(Verbosity::Debug.is_verbose());
            assert!(!Verbosity::Normal.is_verbose());
        }
    }

    mod color_choice_tests {
        use super::*;

        #[test]
        fn test_should_color_fixed_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod layering_tests {
        use super::*;

        #[test]
        fn test_file_then_flag() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("webverify.yaml");
            std::fs::write(&path, "base_url: http://staging:3000\nwait:\n  timeout_ms: 8000\n").unwrap();
            let path_arg = path.to_str().unwrap();

            let cli = Cli::parse_from(["webverify", "--config", path_arg, "config"]);
            let config = load_verify_config(&cli).unwrap();
            assert_eq!(config.base_url, "http://staging:3000");
            assert_eq!(config.wait.timeout_ms, 8000);

            let cli = Cli::parse_from([
                "webverify",
                "--config",
                path_arg,
                "--base-url",
                "http://localhost:3003/",
                "config",
            ]);
            let config = load_verify_config(&cli).unwrap();
            assert_eq!(config.base_url, "http://localhost:3003");
            assert_eq!(config.wait.timeout_ms, 8000);
        }

        #[test]
        fn test_run_flags_override() {
            let mut config = VerifyConfig::default();
            let args = RunArgs {
                timeout: Some(15_000),
                output_dir: Some(PathBuf::from("out")),
                accumulate_artifacts: true,
                browser: BrowserArgs {
                    headed: true,
                    chromium_path: Some("/usr/bin/chromium".into()),
                    no_sandbox: true,
                },
                ..RunArgs::default()
            };
            apply_run_args(&mut config, &args).unwrap();
            assert_eq!(config.wait.timeout_ms, 15_000);
            assert_eq!(config.diagnostics.output_dir, PathBuf::from("out"));
            assert_eq!(config.diagnostics.policy, ArtifactPolicy::Accumulate);
            assert!(!config.browser.headless);
            assert!(!config.browser.sandbox);
            assert_eq!(config.browser.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        }

        #[test]
        fn test_zero_timeout_flag_rejected() {
            let mut config = VerifyConfig::default();
            let args = RunArgs {
                timeout: Some(0),
                ..RunArgs::default()
            };
            let err = apply_run_args(&mut config, &args).unwrap_err();
            assert_eq!(err.exit_code(), 2);
        }
    }
}
