//! Result and error types for webverify.

use std::time::Duration;
use thiserror::Error;

/// Result type for webverify operations
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Errors that can occur while verifying a deployment
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Browser process could not be started
    #[error("Failed to launch browser: {message}")]
    DriverLaunch {
        /// Error message
        message: String,
    },

    /// Navigation failed (network error or error status)
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Element was not actionable when the action fired
    #[error("Interaction with {target} failed: {message}")]
    Interaction {
        /// Locator description of the target element
        target: String,
        /// Error message
        message: String,
    },

    /// Condition never held within its timeout
    #[error("Timed out after {}ms waiting for {description}", elapsed.as_millis())]
    AssertionTimeout {
        /// Predicate description
        description: String,
        /// Time spent polling
        elapsed: Duration,
    },

    /// Cleanup loop exhausted its iterations with artifacts left behind
    #[error("Cleanup incomplete for marker {marker:?}: removed {removed}, {remaining} remaining")]
    CleanupIncomplete {
        /// Marker the loop was scoped to
        marker: String,
        /// Deletions performed
        removed: usize,
        /// Matching artifacts still visible
        remaining: usize,
    },

    /// Screenshot capture failed
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Invalid configuration or scenario definition
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Scenario file could not be parsed
    #[error("Scenario parse error: {message}")]
    ScenarioParse {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used by reports and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Browser launch failure
    DriverLaunch,
    /// Navigation failure
    Navigation,
    /// Interaction failure
    Interaction,
    /// Assertion timeout
    AssertionTimeout,
    /// Cleanup did not converge
    CleanupIncomplete,
    /// Anything else (I/O, config, parse)
    Other,
}

impl VerifyError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an interaction error
    #[must_use]
    pub fn interaction(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Interaction {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a navigation error
    #[must_use]
    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a driver launch error
    #[must_use]
    pub fn launch(message: impl Into<String>) -> Self {
        Self::DriverLaunch {
            message: message.into(),
        }
    }

    /// Create a screenshot error
    #[must_use]
    pub fn screenshot(message: impl Into<String>) -> Self {
        Self::Screenshot {
            message: message.into(),
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DriverLaunch { .. } => ErrorKind::DriverLaunch,
            Self::Navigation { .. } => ErrorKind::Navigation,
            Self::Interaction { .. } => ErrorKind::Interaction,
            Self::AssertionTimeout { .. } => ErrorKind::AssertionTimeout,
            Self::CleanupIncomplete { .. } => ErrorKind::CleanupIncomplete,
            _ => ErrorKind::Other,
        }
    }

    /// Whether this error ends the scenario (cleanup shortfalls do not)
    #[must_use]
    pub const fn is_scenario_fatal(&self) -> bool {
        !matches!(self, Self::CleanupIncomplete { .. })
    }

    /// Whether a failure screenshot can be taken for this error
    #[must_use]
    pub const fn wants_diagnostics(&self) -> bool {
        !matches!(
            self,
            Self::DriverLaunch { .. } | Self::CleanupIncomplete { .. }
        )
    }
}
