//! webverify: post-deployment verification of a running web application
//!
//! Drives a real browser through named scenarios (log in, fill a form,
//! check the public pages) and reports what a user would have seen.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     WEBVERIFY Architecture                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌──────────────┐   ┌────────────┐              │
//! │  │ Scenario   │──►│ Orchestrator │──►│ Session    │──► Chromium  │
//! │  │ (steps)    │   │ (fail-fast)  │   │ (Driver)   │    (CDP)     │
//! │  └────────────┘   └──────┬───────┘   └────────────┘              │
//! │                          │                                       │
//! │         ┌────────────────┼─────────────────┐                     │
//! │         ▼                ▼                 ▼                     │
//! │   ┌──────────┐    ┌────────────┐    ┌─────────────┐              │
//! │   │ Waiter   │    │ Cleanup    │    │ Diagnostics │              │
//! │   │ (poll)   │    │ (bounded)  │    │ (png+json)  │              │
//! │   └──────────┘    └────────────┘    └─────────────┘              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "browser")]
//! # async fn demo() {
//! use std::sync::Arc;
//! use webverify::{scenarios, ChromiumLauncher, Orchestrator, RunSettings, ScenarioParams};
//!
//! let orchestrator = Orchestrator::new(
//!     Arc::new(ChromiumLauncher::default()),
//!     RunSettings::new("http://localhost:3000"),
//! );
//! let run = orchestrator
//!     .run_all(&scenarios::all(&ScenarioParams::default()))
//!     .await;
//! assert_eq!(run.exit_code(false), 0);
//! # }
//! ```

#![warn(missing_docs)]

mod browser;
mod cleanup;
mod clock;
mod config;
mod diagnostics;
mod dialog;
mod driver;
mod locator;
mod orchestrator;
mod report;
mod result;
mod scenario;
mod session;
mod wait;

/// In-memory driver for exercising scenarios without a browser
pub mod mock;

/// Built-in scenarios for the tour site
pub mod scenarios;

#[cfg(test)]
mod testapp;

pub use browser::BrowserSettings;
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumLauncher};
pub use cleanup::{
    cleanup, CleanupOutcome, CleanupSpec, DEFAULT_CLEANUP_SETTLE_MS, DEFAULT_MAX_ITERATIONS,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    DiagnosticsConfig, VerifyConfig, WaitConfig, DEFAULT_BASE_URL, DEFAULT_CONFIG_FILE,
};
pub use diagnostics::{
    ArtifactPolicy, DiagnosticArtifact, Diagnostics, FailedStep, DEFAULT_OUTPUT_DIR,
};
pub use dialog::{DialogPolicy, DialogType, HandledDialog};
pub use driver::{Driver, ElementState, Interaction, Launcher, PickedElement};
pub use locator::{Locator, Pick, Selector};
pub use mock::{MockDriver, MockLauncher};
pub use orchestrator::{NoopListener, Orchestrator, RunListener, RunSettings};
pub use report::{RunReport, ScenarioReport, ScenarioStatus, StepRecord};
pub use result::{ErrorKind, VerifyError, VerifyResult};
pub use scenario::{expand_vars, Action, Scenario, Step, StepState, DEFAULT_UPLOAD_SETTLE_MS};
pub use scenarios::ScenarioParams;
pub use session::{LocatorHandle, Session};
pub use wait::{
    Condition, UrlPattern, WaitOptions, Waiter, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::cleanup::*;
    pub use super::clock::*;
    pub use super::diagnostics::*;
    pub use super::dialog::*;
    pub use super::driver::*;
    pub use super::locator::*;
    pub use super::orchestrator::*;
    pub use super::report::*;
    pub use super::result::*;
    pub use super::scenario::*;
    pub use super::scenarios::ScenarioParams;
    pub use super::session::*;
    pub use super::wait::*;
}
