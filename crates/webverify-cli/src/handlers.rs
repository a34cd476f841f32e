//! Subcommand implementations

use crate::commands::{Cli, CleanupArgs, Commands, ConfigArgs, RunArgs, ValidateArgs};
use crate::config::{apply_browser_args, apply_run_args, load_verify_config, CliConfig};
use crate::error::{CliError, CliResult};
use crate::output::{render_report, ProgressReporter};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use webverify::scenarios::{self, BUILTIN};
use webverify::{
    BrowserSettings, CleanupOutcome, Launcher, Orchestrator, RunSettings, Scenario,
    ScenarioParams, VerifyConfig, VerifyError,
};

/// Run the parsed command; returns the process exit code
pub async fn execute(cli: Cli, config: CliConfig) -> CliResult<u8> {
    match cli.command {
        Commands::List => {
            print!("{}", list_scenarios());
            Ok(0)
        }
        Commands::Validate(ref args) => Ok(validate(args, &reporter(config))),
        Commands::Config(ref args) => {
            print!("{}", show_config(&cli, args)?);
            Ok(0)
        }
        Commands::Run(ref args) => run(&cli, config, args).await,
        Commands::Cleanup(ref args) => cleanup(&cli, config, args).await,
    }
}

fn reporter(config: CliConfig) -> ProgressReporter {
    ProgressReporter::new(
        config.color.should_color(),
        config.verbosity.is_quiet(),
    )
}

/// Built-in names with descriptions, one per line
#[must_use]
pub fn list_scenarios() -> String {
    let width = BUILTIN.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (name, description) in BUILTIN {
        let _ = writeln!(out, "{name:<width$}  {description}");
    }
    out
}

/// Resolve names (or `--all`) then files into scenarios, in that order
pub fn select_scenarios(
    names: &[String],
    all: bool,
    files: &[PathBuf],
    params: &ScenarioParams,
) -> CliResult<Vec<Scenario>> {
    let mut selected = if all {
        scenarios::all(params)
    } else {
        names
            .iter()
            .map(|name| {
                scenarios::builtin(name, params)
                    .ok_or_else(|| CliError::UnknownScenario { name: name.clone() })
            })
            .collect::<CliResult<Vec<_>>>()?
    };
    for file in files {
        selected.push(Scenario::from_file(file)?);
    }
    if selected.is_empty() {
        return Err(CliError::invalid_argument(
            "no scenarios selected; pass scenario names, --all, or --file",
        ));
    }
    Ok(selected)
}

/// Validate each file; 0 if all are valid, 2 otherwise
pub fn validate(args: &ValidateArgs, reporter: &ProgressReporter) -> u8 {
    let mut failures = 0;
    for path in &args.paths {
        match Scenario::from_file(path) {
            Ok(s) => reporter.success(&format!(
                "{}: '{}' with {} step(s){}",
                path.display(),
                s.name,
                s.steps.len(),
                if s.cleanup.is_some() { " and cleanup" } else { "" }
            )),
            Err(e) => {
                failures += 1;
                reporter.failure(&e.to_string());
            }
        }
    }
    if failures == 0 {
        0
    } else {
        2
    }
}

fn show_config(cli: &Cli, args: &ConfigArgs) -> CliResult<String> {
    let config = if args.defaults {
        VerifyConfig::default()
    } else {
        load_verify_config(cli)?
    };
    Ok(config.to_yaml()?)
}

#[cfg(feature = "browser")]
fn launcher(settings: &BrowserSettings) -> CliResult<Arc<dyn Launcher>> {
    Ok(Arc::new(webverify::ChromiumLauncher::new(settings.clone())))
}

#[cfg(not(feature = "browser"))]
fn launcher(_settings: &BrowserSettings) -> CliResult<Arc<dyn Launcher>> {
    Err(CliError::config(
        "webverify was built without the `browser` feature; no browser available",
    ))
}

fn orchestrator(config: &VerifyConfig) -> CliResult<Orchestrator> {
    let settings = RunSettings::new(&config.base_url).with_wait(config.wait_options());
    Ok(Orchestrator::new(launcher(&config.browser)?, settings).with_diagnostics(config.diagnostics()))
}

async fn run(cli: &Cli, config: CliConfig, args: &RunArgs) -> CliResult<u8> {
    let mut verify = load_verify_config(cli)?;
    apply_run_args(&mut verify, args)?;
    let selected = select_scenarios(&args.names, args.all, &args.files, &verify.params)?;

    let reporter = Arc::new(
        reporter(config).with_progress(selected.len() as u64, "Running scenarios"),
    );
    reporter.info(&format!(
        "verifying {} with {} scenario(s)",
        verify.base_url,
        selected.len()
    ));
    let started = Instant::now();
    let orchestrator = orchestrator(&verify)?.with_listener(reporter.clone());
    let report = orchestrator.run_all(&selected).await;
    reporter.finish();
    reporter.summary(&report, started.elapsed());

    print!("{}", render_report(&report, args.format)?);
    Ok(report.exit_code(args.strict_cleanup))
}

async fn cleanup(cli: &Cli, config: CliConfig, args: &CleanupArgs) -> CliResult<u8> {
    let mut verify = load_verify_config(cli)?;
    apply_browser_args(&mut verify, &args.browser);
    let scenario = match (&args.file, &args.name) {
        (Some(file), _) => Scenario::from_file(file)?,
        (None, Some(name)) => scenarios::builtin(name, &verify.params)
            .ok_or_else(|| CliError::UnknownScenario { name: name.clone() })?,
        (None, None) => return Err(CliError::invalid_argument("pass a scenario name or --file")),
    };
    if scenario.cleanup.is_none() {
        return Err(VerifyError::config(format!("scenario '{}' has no cleanup", scenario.name)).into());
    }

    let reporter = Arc::new(reporter(config));
    let orchestrator = orchestrator(&verify)?.with_listener(reporter.clone());
    match orchestrator.run_cleanup_only(&scenario).await? {
        CleanupOutcome::Converged { removed } => {
            reporter.success(&format!("{}: removed {removed} record(s)", scenario.name));
            Ok(0)
        }
        CleanupOutcome::Incomplete { removed, remaining } => {
            reporter.failure(&format!(
                "{}: removed {removed}, {remaining} still present",
                scenario.name
            ));
            Ok(1)
        }
    }
}
