//! Scenario and step model.
//!
//! A [`Scenario`] is an ordered list of [`Step`]s plus an optional
//! [`CleanupSpec`]. Steps run strictly in order; each may navigate, perform
//! one [`Action`], settle for a fixed pause, assert a [`Condition`], and
//! capture a checkpoint screenshot, in that order.
//!
//! Scenarios can be built in code or loaded from YAML:
//!
//! ```yaml
//! name: login
//! steps:
//!   - name: Open login page
//!     navigate: /admin/login
//!   - name: Enter username
//!     action: { type: fill, locator: { css: 'input[type="text"]' }, value: "${ADMIN_USER}" }
//!   - name: Dashboard is shown
//!     action: { type: click, locator: { css: 'button[type="submit"]' } }
//!     expect: { type: visible, locator: { text: Dashboard Overview } }
//!     timeout_ms: 10000
//! ```

use crate::cleanup::CleanupSpec;
use crate::driver::Interaction;
use crate::locator::Locator;
use crate::result::{VerifyError, VerifyResult};
use crate::wait::Condition;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settle-wait applied after uploads when a step does not set one
pub const DEFAULT_UPLOAD_SETTLE_MS: u64 = 2_000;

// =============================================================================
// ACTIONS
// =============================================================================

/// A user interaction performed by a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Replace a field's value
    Fill {
        /// Target field
        locator: Locator,
        /// New value
        value: String,
    },
    /// Click an element
    Click {
        /// Target element
        locator: Locator,
    },
    /// Choose an option of a `<select>`
    Select {
        /// Target select
        locator: Locator,
        /// Option value or label
        value: String,
    },
    /// Attach a local file to a file input
    Upload {
        /// Target file input
        locator: Locator,
        /// Local file
        path: PathBuf,
    },
}

impl Action {
    /// Target element
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        match self {
            Self::Fill { locator, .. }
            | Self::Click { locator }
            | Self::Select { locator, .. }
            | Self::Upload { locator, .. } => locator,
        }
    }

    /// Driver-level interaction
    #[must_use]
    pub fn to_interaction(&self) -> Interaction {
        match self {
            Self::Fill { value, .. } => Interaction::Fill(value.clone()),
            Self::Click { .. } => Interaction::Click,
            Self::Select { value, .. } => Interaction::Select(value.clone()),
            Self::Upload { path, .. } => Interaction::Upload(path.clone()),
        }
    }

    /// Settle-wait implied by the action when the step sets none
    #[must_use]
    pub const fn default_settle(&self) -> Duration {
        match self {
            Self::Upload { .. } => Duration::from_millis(DEFAULT_UPLOAD_SETTLE_MS),
            _ => Duration::ZERO,
        }
    }
}

// =============================================================================
// STEPS
// =============================================================================

/// Lifecycle of a step within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Not started (or never reached after an earlier failure)
    #[default]
    Pending,
    /// In progress
    Running,
    /// Completed and its postcondition held
    Passed,
    /// Failed; the scenario stops here
    Failed,
}

/// One unit of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Display name
    pub name: String,
    /// Path (relative to the base URL) or absolute URL to load first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate: Option<String>,
    /// Interaction to perform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Postcondition to wait for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<Condition>,
    /// Postcondition timeout override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Fixed pause after the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_ms: Option<u64>,
    /// Screenshot name captured once the postcondition holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
    /// Capture the checkpoint beyond the viewport
    #[serde(default)]
    pub full_page: bool,
}

impl Step {
    /// Create an empty step
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            navigate: None,
            action: None,
            expect: None,
            timeout_ms: None,
            settle_ms: None,
            checkpoint: None,
            full_page: false,
        }
    }

    /// Load `target` before acting
    #[must_use]
    pub fn navigate(mut self, target: impl Into<String>) -> Self {
        self.navigate = Some(target.into());
        self
    }

    /// Perform `action`
    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Fill `locator` with `value`
    #[must_use]
    pub fn fill(self, locator: Locator, value: impl Into<String>) -> Self {
        self.action(Action::Fill {
            locator,
            value: value.into(),
        })
    }

    /// Click `locator`
    #[must_use]
    pub fn click(self, locator: Locator) -> Self {
        self.action(Action::Click { locator })
    }

    /// Select `value` in `locator`
    #[must_use]
    pub fn select(self, locator: Locator, value: impl Into<String>) -> Self {
        self.action(Action::Select {
            locator,
            value: value.into(),
        })
    }

    /// Upload `path` through `locator`
    #[must_use]
    pub fn upload(self, locator: Locator, path: impl Into<PathBuf>) -> Self {
        self.action(Action::Upload {
            locator,
            path: path.into(),
        })
    }

    /// Wait for `condition` after acting
    #[must_use]
    pub fn expect(mut self, condition: Condition) -> Self {
        self.expect = Some(condition);
        self
    }

    /// Override the postcondition timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Pause for `duration` after acting
    #[must_use]
    pub fn settle(mut self, duration: Duration) -> Self {
        self.settle_ms = Some(duration.as_millis() as u64);
        self
    }

    /// Capture a named screenshot once the postcondition holds
    #[must_use]
    pub fn checkpoint(mut self, name: impl Into<String>, full_page: bool) -> Self {
        self.checkpoint = Some(name.into());
        self.full_page = full_page;
        self
    }

    /// Postcondition timeout, falling back to the run default
    #[must_use]
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_ms.map_or(default, Duration::from_millis)
    }

    /// Effective settle-wait
    #[must_use]
    pub fn effective_settle(&self) -> Duration {
        match (self.settle_ms, &self.action) {
            (Some(ms), _) => Duration::from_millis(ms),
            (None, Some(action)) => action.default_settle(),
            (None, None) => Duration::ZERO,
        }
    }

    fn is_empty(&self) -> bool {
        self.navigate.is_none()
            && self.action.is_none()
            && self.expect.is_none()
            && self.settle_ms.is_none()
            && self.checkpoint.is_none()
    }
}

// =============================================================================
// SCENARIOS
// =============================================================================

/// An ordered, named sequence of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name (also used for artifact file names)
    pub name: String,
    /// One-line summary
    #[serde(default)]
    pub description: String,
    /// Steps in execution order
    pub steps: Vec<Step>,
    /// Teardown of artifacts created by the steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupSpec>,
}

impl Scenario {
    /// Create an empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
            cleanup: None,
        }
    }

    /// Set the description
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps
    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Attach a cleanup spec
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: CleanupSpec) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    /// Parse YAML, then expand `${NAME}` in string values from the environment
    ///
    /// # Errors
    ///
    /// `ScenarioParse` for unset variables or malformed YAML, `Config` if
    /// the parsed scenario is invalid.
    pub fn from_yaml(yaml: &str) -> VerifyResult<Self> {
        Self::from_yaml_with(yaml, |name| std::env::var(name).ok())
    }

    /// [`Scenario::from_yaml`] with variables resolved by `lookup`
    ///
    /// Substitution happens after parsing, so values are taken literally
    /// and can never change the document's structure.
    ///
    /// # Errors
    ///
    /// Same as [`Scenario::from_yaml`].
    pub fn from_yaml_with<F>(yaml: &str, lookup: F) -> VerifyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_error = |e: serde_yaml_ng::Error| VerifyError::ScenarioParse {
            message: e.to_string(),
        };
        let mut document: serde_yaml_ng::Value = serde_yaml_ng::from_str(yaml).map_err(parse_error)?;
        expand_strings(&mut document, &lookup)?;
        let scenario: Self = serde_yaml_ng::from_value(document).map_err(parse_error)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a YAML scenario file
    pub fn from_file(path: &Path) -> VerifyResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml).map_err(|e| match e {
            VerifyError::ScenarioParse { message } => VerifyError::ScenarioParse {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })
    }

    /// Check structural rules
    ///
    /// # Errors
    ///
    /// `Config` naming the first violation found.
    pub fn validate(&self) -> VerifyResult<()> {
        if self.name.trim().is_empty() {
            return Err(VerifyError::config("scenario name is empty"));
        }
        if self.steps.is_empty() {
            return Err(VerifyError::config(format!(
                "scenario {:?} has no steps",
                self.name
            )));
        }
        for (index, step) in self.steps.iter().enumerate() {
            let at = format!("scenario {:?} step {}", self.name, index + 1);
            if step.name.trim().is_empty() {
                return Err(VerifyError::config(format!("{at}: name is empty")));
            }
            if step.is_empty() {
                return Err(VerifyError::config(format!("{at} ({:?}) does nothing", step.name)));
            }
            if step.timeout_ms == Some(0) {
                return Err(VerifyError::config(format!("{at}: timeout_ms must be positive")));
            }
            if let Some(Condition::UrlMatches { ref pattern }) = step.expect {
                pattern
                    .validate()
                    .map_err(|e| VerifyError::config(format!("{at}: {e}")))?;
            }
        }
        if let Some(ref cleanup) = self.cleanup {
            cleanup.validate()?;
        }
        Ok(())
    }
}

fn expand_strings<F>(value: &mut serde_yaml_ng::Value, lookup: &F) -> VerifyResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    use serde_yaml_ng::Value;
    match value {
        Value::String(text) if text.contains("${") => {
            *text = expand_vars(text, lookup)?;
        }
        Value::Sequence(items) => {
            for item in items {
                expand_strings(item, lookup)?;
            }
        }
        Value::Mapping(map) => {
            for item in map.values_mut() {
                expand_strings(item, lookup)?;
            }
        }
        Value::Tagged(tagged) => expand_strings(&mut tagged.value, lookup)?,
        _ => {}
    }
    Ok(())
}

/// Replace `${NAME}` and `${NAME:-default}` using `lookup`
///
/// # Errors
///
/// `ScenarioParse` naming the first variable that is unset and has no default.
pub fn expand_vars<F>(text: &str, lookup: F) -> VerifyResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").map_err(|e| {
        VerifyError::ScenarioParse {
            message: e.to_string(),
        }
    })?;
    let mut missing: Option<String> = None;
    let expanded = pattern.replace_all(text, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        lookup(name)
            .or_else(|| caps.get(2).map(|d| d.as_str().to_string()))
            .unwrap_or_else(|| {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            })
    });
    match missing {
        Some(name) => Err(VerifyError::ScenarioParse {
            message: format!("environment variable {name} is not set"),
        }),
        None => Ok(expanded.into_owned()),
    }
}
