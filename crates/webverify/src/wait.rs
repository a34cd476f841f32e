//! Wait/assertion engine.
//!
//! Every postcondition in a scenario goes through [`Waiter::await_condition`]:
//! an explicit, bounded polling loop over live page state.
//!
//! - the condition is re-evaluated on every tick (nothing is cached);
//! - a condition that already holds returns immediately;
//! - the last evaluation happens exactly at the deadline, so a condition
//!   that becomes true at `timeout` still passes;
//! - each evaluation races the clock: one that hangs is abandoned at the
//!   deadline (the evaluation started at the deadline gets one poll
//!   interval);
//! - sleeping goes through the injected [`Clock`], never a busy spin.

use crate::clock::{Clock, SystemClock};
use crate::driver::Driver;
use crate::locator::Locator;
use crate::result::{VerifyError, VerifyResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for a postcondition (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// =============================================================================
// URL PATTERNS
// =============================================================================

/// Pattern for matching the page URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlPattern {
    /// Glob: `**` matches anything, `*` anything but `/`, `?` one character
    Glob(String),
    /// Regular expression
    Regex(String),
    /// Substring match
    Contains(String),
    /// Exact match
    Exact(String),
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    ///
    /// Invalid regexes never match.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Glob(pattern) => regex::Regex::new(&glob_to_regex(pattern))
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Exact(pattern) => url == pattern,
        }
    }

    /// Check that a regex or glob pattern compiles
    pub fn validate(&self) -> VerifyResult<()> {
        let source = match self {
            Self::Glob(pattern) => glob_to_regex(pattern),
            Self::Regex(pattern) => pattern.clone(),
            Self::Contains(_) | Self::Exact(_) => return Ok(()),
        };
        regex::Regex::new(&source)
            .map(|_| ())
            .map_err(|e| VerifyError::config(format!("invalid URL pattern {self}: {e}")))
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Glob(p) => write!(f, "glob {p:?}"),
            Self::Regex(p) => write!(f, "regex {p:?}"),
            Self::Contains(p) => write!(f, "containing {p:?}"),
            Self::Exact(p) => write!(f, "{p:?}"),
        }
    }
}

/// Translate a URL glob into an anchored regex
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// Predicates supported by the wait engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Picked element exists and is visible
    Visible {
        /// Target
        locator: Locator,
    },
    /// Picked element is absent or not visible
    Hidden {
        /// Target
        locator: Locator,
    },
    /// Number of matches equals `count`
    Count {
        /// Target
        locator: Locator,
        /// Expected number of matches
        count: usize,
    },
    /// Picked element's text contains `text`
    TextPresent {
        /// Container
        locator: Locator,
        /// Expected substring
        text: String,
    },
    /// Current URL matches
    UrlMatches {
        /// URL pattern
        pattern: UrlPattern,
    },
}

impl Condition {
    /// `locator` is visible
    #[must_use]
    pub const fn visible(locator: Locator) -> Self {
        Self::Visible { locator }
    }

    /// `locator` is hidden or absent
    #[must_use]
    pub const fn hidden(locator: Locator) -> Self {
        Self::Hidden { locator }
    }

    /// `locator` matches exactly `count` elements
    #[must_use]
    pub const fn count(locator: Locator, count: usize) -> Self {
        Self::Count { locator, count }
    }

    /// `locator` contains `text`
    #[must_use]
    pub fn text_present(locator: Locator, text: impl Into<String>) -> Self {
        Self::TextPresent {
            locator,
            text: text.into(),
        }
    }

    /// URL matches a glob
    #[must_use]
    pub fn url_glob(glob: impl Into<String>) -> Self {
        Self::UrlMatches {
            pattern: UrlPattern::Glob(glob.into()),
        }
    }

    /// Human-readable description, used in timeout messages
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Visible { locator } => format!("{} to be visible", locator.description()),
            Self::Hidden { locator } => format!("{} to be hidden", locator.description()),
            Self::Count { locator, count } => {
                format!("{} to match {count} element(s)", locator.description())
            }
            Self::TextPresent { locator, text } => {
                format!("{} to contain text {text:?}", locator.description())
            }
            Self::UrlMatches { pattern } => format!("URL to match {pattern}"),
        }
    }

    /// Evaluate once against the live page
    pub async fn evaluate(&self, driver: &dyn Driver) -> VerifyResult<bool> {
        Ok(match self {
            Self::Visible { locator } => driver.probe(locator).await?.is_visible(),
            Self::Hidden { locator } => !driver.probe(locator).await?.is_visible(),
            Self::Count { locator, count } => driver.probe(locator).await?.count == *count,
            Self::TextPresent { locator, text } => driver
                .probe(locator)
                .await?
                .picked
                .is_some_and(|el| el.text.contains(text.as_str())),
            Self::UrlMatches { pattern } => pattern.matches(&driver.current_url().await?),
        })
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Hard deadline
    pub timeout: Duration,
    /// Pause between evaluations
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

// =============================================================================
// WAITER IMPLEMENTATION
// =============================================================================

/// Polling engine bound to a clock
#[derive(Debug, Clone)]
pub struct Waiter {
    clock: Arc<dyn Clock>,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock::new()))
    }
}

impl Waiter {
    /// Create a waiter using `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// The clock used for polling and settle-waits
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Poll `condition` until it holds or `options.timeout` elapses
    ///
    /// Returns the elapsed time on success. Driver errors raised while
    /// evaluating propagate immediately; "not found" is not an error.
    pub async fn await_condition(
        &self,
        driver: &dyn Driver,
        condition: &Condition,
        options: &WaitOptions,
    ) -> VerifyResult<Duration> {
        self.poll(&condition.description(), options, || condition.evaluate(driver))
            .await
    }

    /// Poll an arbitrary async predicate with the same deadline rules
    pub async fn poll<F, Fut>(
        &self,
        description: &str,
        options: &WaitOptions,
        mut predicate: F,
    ) -> VerifyResult<Duration>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = VerifyResult<bool>>,
    {
        let start = self.clock.now();
        let mut polls = 0_u32;
        loop {
            polls += 1;
            let left = options.timeout.saturating_sub(self.clock.now().saturating_sub(start));
            let budget = if left.is_zero() { options.poll_interval } else { left };
            let satisfied = tokio::select! {
                biased;
                result = predicate() => result?,
                () = self.clock.sleep(budget) => {
                    let elapsed = self.clock.now().saturating_sub(start);
                    tracing::debug!(%description, polls, elapsed_ms = elapsed.as_millis() as u64, "evaluation abandoned");
                    return Err(VerifyError::AssertionTimeout {
                        description: description.to_string(),
                        elapsed,
                    });
                }
            };
            let elapsed = self.clock.now().saturating_sub(start);
            if satisfied {
                tracing::debug!(%description, polls, elapsed_ms = elapsed.as_millis() as u64, "condition met");
                return Ok(elapsed);
            }
            if elapsed >= options.timeout {
                return Err(VerifyError::AssertionTimeout {
                    description: description.to_string(),
                    elapsed,
                });
            }
            let remaining = options.timeout - elapsed;
            self.clock.sleep(options.poll_interval.min(remaining)).await;
        }
    }

    /// Fixed pause where no observable signal exists (settle-wait)
    pub async fn settle(&self, duration: Duration) {
        if !duration.is_zero() {
            tracing::debug!(settle_ms = duration.as_millis() as u64, "settling");
            self.clock.sleep(duration).await;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
