//! webverify: post-deployment browser verification
//!
//! ## Usage
//!
//! ```bash
//! webverify list                                  # Built-in scenarios
//! webverify run login --base-url http://localhost:3003
//! webverify run --all --format json > report.json
//! webverify run -f checkout.yaml --headed
//! webverify cleanup full-features                 # Remove leftover records
//! ```

use clap::Parser;
use std::process::ExitCode;
use webverify_cli::{execute, logging, Cli, CliConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = CliConfig::from_cli(&cli);

    if let Err(e) = logging::init(config.verbosity, config.log_format) {
        eprintln!("Error: {e}");
        return ExitCode::from(e.exit_code());
    }
    tracing::debug!(?config, "starting");

    match execute(cli, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
