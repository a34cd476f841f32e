//! Marker-scoped teardown of test artifacts.
//!
//! The loop deletes one matching row at a time and re-reads the live list
//! after every attempt, because the list re-renders (and indices shift)
//! each time. Attempts are bounded by `max_iterations`; a row only counts
//! as removed once the live list shows one fewer marked row. There are
//! exactly two outcomes: the marker is gone, or it is not and the caller is
//! told how many rows were removed and how many remain.

use crate::dialog::DialogPolicy;
use crate::driver::Interaction;
use crate::locator::Locator;
use crate::result::{VerifyError, VerifyResult};
use crate::scenario::{Action, Step};
use crate::session::Session;
use crate::wait::Waiter;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on deletions per cleanup run
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Default pause after each deletion
pub const DEFAULT_CLEANUP_SETTLE_MS: u64 = 1_000;

fn default_row() -> Locator {
    Locator::css("tr")
}

fn default_delete() -> Locator {
    Locator::css("button")
}

const fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

const fn default_settle_ms() -> u64 {
    DEFAULT_CLEANUP_SETTLE_MS
}

/// How to find and delete a scenario's artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupSpec {
    /// List page to load first (relative to the base URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_path: Option<String>,
    /// One artifact per match (filtered by the marker)
    #[serde(default = "default_row")]
    pub row: Locator,
    /// Text identifying artifacts this scenario created
    pub marker: String,
    /// Delete control, searched within the row
    #[serde(default = "default_delete")]
    pub delete: Locator,
    /// Page-level actions after the in-row click, in order
    ///
    /// For UIs where the row only selects the record and a separate control
    /// (e.g. an edit panel's "Delete" button) removes it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub then: Vec<Action>,
    /// How the confirm dialog is answered
    #[serde(default)]
    pub dialog: DialogPolicy,
    /// Upper bound on delete attempts
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Pause after each deletion
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Steps run first when cleanup runs on its own (e.g. logging in)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setup: Vec<Step>,
}

impl CleanupSpec {
    /// Rows of `tr` containing `marker`, deleted with their `button`
    #[must_use]
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            list_path: None,
            row: default_row(),
            marker: marker.into(),
            delete: default_delete(),
            then: Vec::new(),
            dialog: DialogPolicy::AcceptAll,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            settle_ms: DEFAULT_CLEANUP_SETTLE_MS,
            setup: Vec::new(),
        }
    }

    /// Load `path` before probing
    #[must_use]
    pub fn on_page(mut self, path: impl Into<String>) -> Self {
        self.list_path = Some(path.into());
        self
    }

    /// Use `row` as the artifact locator base
    #[must_use]
    pub fn with_row(mut self, row: Locator) -> Self {
        self.row = row;
        self
    }

    /// Use `delete` as the in-row delete control
    #[must_use]
    pub fn with_delete(mut self, delete: Locator) -> Self {
        self.delete = delete;
        self
    }

    /// Append a page-level action run after the in-row click
    #[must_use]
    pub fn then(mut self, action: Action) -> Self {
        self.then.push(action);
        self
    }

    /// Bound delete attempts
    #[must_use]
    pub const fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Steps needed before a standalone cleanup
    #[must_use]
    pub fn with_setup(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.setup = steps.into_iter().collect();
        self
    }

    /// Pause after each deletion
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle_ms = settle.as_millis() as u64;
        self
    }

    /// First row containing the marker
    #[must_use]
    pub fn row_locator(&self) -> Locator {
        self.row.clone().with_text(self.marker.clone())
    }

    /// Delete control inside the first marked row
    #[must_use]
    pub fn delete_locator(&self) -> Locator {
        self.row_locator().locator(self.delete.clone())
    }

    /// Reject specs that could delete unrelated data or never run
    ///
    /// # Errors
    ///
    /// `Config` for an empty marker or a zero iteration bound.
    pub fn validate(&self) -> VerifyResult<()> {
        if self.marker.trim().is_empty() {
            return Err(VerifyError::config(
                "cleanup marker is empty; it would match every row",
            ));
        }
        if self.max_iterations == 0 {
            return Err(VerifyError::config("cleanup max_iterations must be positive"));
        }
        Ok(())
    }
}

/// Result of a cleanup run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// No marked row is visible any more
    Converged {
        /// Rows deleted
        removed: usize,
    },
    /// Iterations ran out with marked rows still visible
    Incomplete {
        /// Rows that actually disappeared (at most the iteration bound)
        removed: usize,
        /// Marked rows still visible
        remaining: usize,
    },
}

impl CleanupOutcome {
    /// Rows deleted
    #[must_use]
    pub const fn removed(&self) -> usize {
        match *self {
            Self::Converged { removed } | Self::Incomplete { removed, .. } => removed,
        }
    }

    /// Whether the marker is gone
    #[must_use]
    pub const fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    /// Convert an incomplete outcome into `CleanupIncomplete`
    pub fn into_result(self, marker: &str) -> VerifyResult<usize> {
        match self {
            Self::Converged { removed } => Ok(removed),
            Self::Incomplete { removed, remaining } => Err(VerifyError::CleanupIncomplete {
                marker: marker.to_string(),
                removed,
                remaining,
            }),
        }
    }
}

/// Marked rows currently on the page; zero unless the first one is visible
async fn marked_rows(session: &Session, row: &Locator) -> VerifyResult<usize> {
    let state = session.locate(row.clone()).state().await?;
    Ok(if state.is_visible() { state.count } else { 0 })
}

/// Delete every visible row carrying the marker, one at a time
///
/// Arms the dialog handler before the first delete click. Interaction and
/// navigation failures propagate; a shortfall is reported as
/// [`CleanupOutcome::Incomplete`], not as an error. `removed` counts rows
/// the live list lost, never clicks, and is capped by the attempts made.
pub async fn cleanup(
    session: &Session,
    spec: &CleanupSpec,
    waiter: &Waiter,
) -> VerifyResult<CleanupOutcome> {
    spec.validate()?;
    if let Some(ref path) = spec.list_path {
        session.navigate(path).await?;
    }

    let row = spec.row_locator();
    let delete = spec.delete_locator();
    let settle = Duration::from_millis(spec.settle_ms);
    let initial = marked_rows(session, &row).await?;
    let mut remaining = initial;
    let mut attempts = 0;
    let mut removed = 0;

    while remaining > 0 && attempts < spec.max_iterations {
        if attempts == 0 {
            session.driver().arm_dialogs(spec.dialog).await?;
        }
        attempts += 1;
        session.act(&delete, &Interaction::Click).await?;
        for action in &spec.then {
            session.act(action.locator(), &action.to_interaction()).await?;
        }
        waiter.settle(settle).await;

        remaining = marked_rows(session, &row).await?;
        let gone = initial.saturating_sub(remaining).min(attempts);
        if gone > removed {
            removed = gone;
            tracing::info!(marker = %spec.marker, removed, "deleted test artifact");
        } else {
            tracing::debug!(marker = %spec.marker, attempts, remaining, "delete attempt removed nothing");
        }
    }

    if remaining == 0 {
        tracing::info!(marker = %spec.marker, removed, "cleanup converged");
        Ok(CleanupOutcome::Converged { removed })
    } else {
        tracing::warn!(marker = %spec.marker, removed, remaining, attempts, "cleanup incomplete");
        Ok(CleanupOutcome::Incomplete { removed, remaining })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::mock::{MockDom, MockDriver, MockStore, NodeId};
    use proptest::prelude::*;
    use std::sync::Arc;

    const MARKER: &str = "Verification Tour";

    /// Admin list whose delete buttons remove the row's record from the store
    fn admin_list(tours: &[&str]) -> MockDriver {
        let driver = MockDriver::new();
        driver.seed("tours", tours);
        driver.route("/admin/tours", |dom: &mut MockDom, store: &MockStore| {
            let root = dom.root();
            let table = dom.add(root, "table").id();
            for (i, title) in store.get("tours").into_iter().flatten().enumerate() {
                let row = dom.add(table, "tr").attr("data-index", &i.to_string()).id();
                dom.add(row, "td").text(title);
                dom.add(row, "button").text("Delete");
            }
        });
        driver.on_confirmed_click(
            Locator::css("tr button"),
            "Are you sure you want to delete this tour?",
            |dom: &mut MockDom, store: &mut MockStore, node: NodeId| {
                let index = dom
                    .closest(node, "tr")
                    .and_then(|tr| dom.attr(tr, "data-index"))
                    .and_then(|i| i.parse::<usize>().ok());
                if let (Some(i), Some(tours)) = (index, store.get_mut("tours")) {
                    tours.remove(i);
                }
                dom.redirect("/admin/tours");
            },
        );
        driver
    }

    async fn run(driver: &MockDriver, spec: &CleanupSpec) -> VerifyResult<CleanupOutcome> {
        let waiter = Waiter::new(Arc::new(ManualClock::new()));
        let mut session = Session::new(Box::new(driver.clone()), "http://localhost:3003");
        let outcome = cleanup(&session, spec, &waiter).await;
        session.close().await.unwrap();
        outcome
    }

    fn spec() -> CleanupSpec {
        CleanupSpec::new(MARKER).on_page("/admin/tours")
    }

    mod spec_tests {
        use super::*;

        #[test]
        fn test_empty_marker_rejected() {
            let err = CleanupSpec::new("  ").validate().unwrap_err();
            assert!(matches!(err, VerifyError::Config { .. }));
        }

        #[test]
        fn test_zero_iterations_rejected() {
            assert!(spec().with_max_iterations(0).validate().is_err());
        }

        #[test]
        fn test_defaults_from_yaml() {
            let spec: CleanupSpec = serde_yaml_ng::from_str("marker: Verification Tour\n").unwrap();
            assert_eq!(spec.max_iterations, DEFAULT_MAX_ITERATIONS);
            assert_eq!(spec.settle_ms, DEFAULT_CLEANUP_SETTLE_MS);
            assert_eq!(spec.row, Locator::css("tr"));
            assert_eq!(spec.dialog, DialogPolicy::AcceptAll);
        }

        #[test]
        fn test_follow_up_actions_from_yaml() {
            let yaml = "marker: Test Pin Kandy\nthen:\n  - type: click\n    locator: { text: Delete Pin }\n";
            let spec: CleanupSpec = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(
                spec.then,
                vec![Action::Click {
                    locator: Locator::text("Delete Pin")
                }]
            );
            assert!(CleanupSpec::new(MARKER).then.is_empty());
        }

        #[test]
        fn test_delete_locator_is_scoped_to_marked_row() {
            assert_eq!(
                spec().delete_locator().description(),
                "css \"button\" within css \"tr\" with text \"Verification Tour\""
            );
        }

        #[test]
        fn test_outcome_into_result() {
            assert_eq!(CleanupOutcome::Converged { removed: 2 }.into_result(MARKER).unwrap(), 2);
            let err = CleanupOutcome::Incomplete { removed: 20, remaining: 5 }
                .into_result(MARKER)
                .unwrap_err();
            assert!(matches!(err, VerifyError::CleanupIncomplete { removed: 20, remaining: 5, .. }));
        }
    }

    mod loop_tests {
        use super::*;

        #[tokio::test]
        async fn test_nothing_to_delete_converges_without_arming() {
            let driver = admin_list(&["Cultural Triangle"]);
            let outcome = run(&driver, &spec()).await.unwrap();
            assert_eq!(outcome, CleanupOutcome::Converged { removed: 0 });
            assert!(driver.handled_dialogs().is_empty());
        }

        #[tokio::test]
        async fn test_marker_isolation_with_interleaved_rows() {
            let driver = admin_list(&[
                MARKER,
                "Cultural Triangle",
                MARKER,
                "Hill Country Escape",
                MARKER,
            ]);
            let outcome = run(&driver, &spec()).await.unwrap();
            assert_eq!(outcome, CleanupOutcome::Converged { removed: 3 });
            assert_eq!(
                driver.records("tours"),
                vec!["Cultural Triangle", "Hill Country Escape"]
            );
            assert_eq!(driver.handled_dialogs().len(), 3);
        }

        #[tokio::test]
        async fn test_exactly_max_rows_converges() {
            let driver = admin_list(&[MARKER; 4]);
            let outcome = run(&driver, &spec().with_max_iterations(4)).await.unwrap();
            assert_eq!(outcome, CleanupOutcome::Converged { removed: 4 });
        }

        #[tokio::test]
        async fn test_more_than_max_reports_partial_progress() {
            let driver = admin_list(&[MARKER; 7]);
            let outcome = run(&driver, &spec().with_max_iterations(5)).await.unwrap();
            assert_eq!(outcome, CleanupOutcome::Incomplete { removed: 5, remaining: 2 });
            assert_eq!(driver.records("tours").len(), 2);
        }

        #[tokio::test]
        async fn test_dismissed_dialog_removes_nothing() {
            let driver = admin_list(&[MARKER, MARKER]);
            let mut s = spec().with_max_iterations(3);
            s.dialog = DialogPolicy::DismissAll;
            let outcome = run(&driver, &s).await.unwrap();
            assert_eq!(outcome, CleanupOutcome::Incomplete { removed: 0, remaining: 2 });
            // Every attempt clicked; none of them deleted anything
            assert_eq!(driver.handled_dialogs().len(), 3);
            assert_eq!(driver.records("tours").len(), 2);
        }

        #[tokio::test]
        async fn test_unresponsive_delete_is_not_counted() {
            let driver = admin_list(&[MARKER, "Cultural Triangle", MARKER]);
            driver.on_click(Locator::css("td"), |_, _, _| {});
            let s = spec().with_delete(Locator::css("td")).with_max_iterations(4);
            let outcome = run(&driver, &s).await.unwrap();
            assert_eq!(outcome, CleanupOutcome::Incomplete { removed: 0, remaining: 2 });
        }

        #[tokio::test]
        async fn test_follow_up_actions_delete_selected_record() {
            let driver = MockDriver::new();
            driver.seed("pins", &["Test Pin Kandy", "Sigiriya", "Test Pin Kandy"]);
            driver.route("/admin/map", |dom: &mut MockDom, store: &MockStore| {
                let root = dom.root();
                let list = dom.add(root, "div").id();
                for (i, name) in store.get("pins").into_iter().flatten().enumerate() {
                    let entry = dom
                        .add(list, "div")
                        .class("cursor-pointer")
                        .attr("data-index", &i.to_string())
                        .id();
                    dom.add(entry, "span").text(name);
                }
                dom.add(root, "button").text("Delete Pin").hidden();
            });
            driver.on_click(
                Locator::css("div.cursor-pointer"),
                |dom: &mut MockDom, store: &mut MockStore, node: NodeId| {
                    let index = dom
                        .closest(node, "div")
                        .and_then(|d| dom.attr(d, "data-index"))
                        .map(str::to_string);
                    if let Some(index) = index {
                        store.insert("editing".into(), vec![index]);
                    }
                    if let Some(button) = dom.pick(&Locator::css("button").with_text("Delete Pin")) {
                        dom.set_hidden(button, false);
                    }
                },
            );
            driver.on_confirmed_click(
                Locator::css("button").with_text("Delete Pin"),
                "Are you sure?",
                |dom: &mut MockDom, store: &mut MockStore, _| {
                    let index = store
                        .remove("editing")
                        .and_then(|v| v.first().and_then(|i| i.parse::<usize>().ok()));
                    if let (Some(i), Some(pins)) = (index, store.get_mut("pins")) {
                        pins.remove(i);
                    }
                    dom.redirect("/admin/map");
                },
            );

            let s = CleanupSpec::new("Test Pin Kandy")
                .on_page("/admin/map")
                .with_row(Locator::css("div.cursor-pointer"))
                .with_delete(Locator::css("span"))
                .then(Action::Click {
                    locator: Locator::css("button").with_text("Delete Pin"),
                });
            let outcome = run(&driver, &s).await.unwrap();
            assert_eq!(outcome, CleanupOutcome::Converged { removed: 2 });
            assert_eq!(driver.records("pins"), vec!["Sigiriya"]);
            assert_eq!(driver.handled_dialogs().len(), 2);
        }

        #[tokio::test]
        async fn test_page_failure_is_not_convergence() {
            let driver = admin_list(&[MARKER]);
            driver.fail_state_reads(true);
            let err = run(&driver, &spec()).await.unwrap_err();
            assert!(matches!(err, VerifyError::Navigation { .. }));
            assert_eq!(driver.records("tours"), vec![MARKER]);
        }

        #[tokio::test]
        async fn test_settle_uses_waiter_clock() {
            let driver = admin_list(&[MARKER, MARKER]);
            let clock = ManualClock::new();
            let waiter = Waiter::new(Arc::new(clock.clone()));
            let mut session = Session::new(Box::new(driver.clone()), "http://localhost:3003");
            cleanup(&session, &spec(), &waiter).await.unwrap();
            session.close().await.unwrap();
            assert_eq!(
                crate::clock::Clock::now(&clock),
                Duration::from_millis(2 * DEFAULT_CLEANUP_SETTLE_MS)
            );
        }

        #[tokio::test]
        async fn test_missing_list_page_is_navigation_error() {
            let driver = MockDriver::new();
            let err = run(&driver, &spec()).await.unwrap_err();
            assert!(matches!(err, VerifyError::Navigation { .. }));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_cleanup_counts(marked in 0usize..12, other in 0usize..4, max in 1usize..10) {
            let mut tours = vec!["Cultural Triangle"; other];
            tours.extend(std::iter::repeat(MARKER).take(marked));
            let driver = admin_list(&tours);
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let outcome = rt.block_on(run(&driver, &spec().with_max_iterations(max))).unwrap();

            prop_assert!(outcome.removed() <= max);
            if marked <= max {
                prop_assert_eq!(outcome, CleanupOutcome::Converged { removed: marked });
            } else {
                prop_assert_eq!(outcome, CleanupOutcome::Incomplete { removed: max, remaining: marked - max });
            }
            let left = driver.records("tours");
            prop_assert_eq!(left.iter().filter(|t| t.as_str() != MARKER).count(), other);
        }
    }
}
