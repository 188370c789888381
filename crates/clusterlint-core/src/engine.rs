//! Check execution engine.
//!
//! A run fetches one snapshot, resolves the selected checks, runs every check
//! on its own worker thread against the shared snapshot, merges their
//! diagnostics and applies the post-run filters.
//!
//! Failure is all-or-nothing: if any check returns an error or panics, the
//! run fails with that check's name and no diagnostics are returned, even
//! when every other check succeeded. Sibling workers are not interrupted;
//! the error is reported once all of them have been joined.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::check::Check;
use crate::diagnostic::{Diagnostic, Severity};
use crate::fetch::ObjectFetcher;
use crate::filter::{CheckFilter, DiagnosticFilter, ObjectFilter};
use crate::objects::Objects;
use crate::registry::Registry;
use crate::{LintError, Result};

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckResult {
    /// Diagnostics that survived the post-run filters.
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckResult {
    /// Whether any error-severity diagnostic was reported.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Number of diagnostics per severity.
    #[must_use]
    pub fn count_by_severity(&self) -> HashMap<Severity, usize> {
        let mut counts = HashMap::new();
        for d in &self.diagnostics {
            *counts.entry(d.severity).or_insert(0) += 1;
        }
        counts
    }

    /// Sort diagnostics by namespace, object name, then check name.
    ///
    /// The sort is stable, so diagnostics a check emitted for the same
    /// object keep their relative order.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            a.object
                .namespace
                .cmp(&b.object.namespace)
                .then_with(|| a.object.name.cmp(&b.object.name))
                .then_with(|| a.check.cmp(&b.check))
        });
    }
}

/// Run the selected checks against a freshly fetched snapshot.
///
/// # Errors
///
/// - [`LintError::Fetch`] if the snapshot cannot be fetched
/// - [`LintError::NoChecksToRun`] if the filter selects no checks
/// - [`LintError::CheckFailed`] if any check errors or panics
pub async fn run(
    fetcher: &dyn ObjectFetcher,
    registry: &Registry,
    check_filter: &CheckFilter,
    diagnostic_filter: &DiagnosticFilter,
    object_filter: &ObjectFilter,
) -> Result<CheckResult> {
    let started = Instant::now();
    let mut objects = fetcher.fetch_objects(object_filter).await?;
    object_filter.apply(&mut objects);

    info!(
        objects = objects.len(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Fetched cluster objects"
    );

    let checks = check_filter.filter_checks(registry);
    if checks.is_empty() {
        return Err(LintError::NoChecksToRun);
    }

    let diagnostic_filter = *diagnostic_filter;
    tokio::task::spawn_blocking(move || run_checks(&objects, &checks, &diagnostic_filter))
        .await
        .map_err(|e| LintError::Internal(format!("check runner failed: {e}")))?
}

/// Run checks against a snapshot the caller already holds.
///
/// Each check gets its own worker thread; the call returns once every worker
/// has finished.
///
/// # Errors
///
/// Returns [`LintError::NoChecksToRun`] if `checks` is empty and
/// [`LintError::CheckFailed`] if any check errors or panics.
pub fn run_checks(
    objects: &Objects,
    checks: &[Arc<dyn Check>],
    diagnostic_filter: &DiagnosticFilter,
) -> Result<CheckResult> {
    if checks.is_empty() {
        return Err(LintError::NoChecksToRun);
    }

    info!(checks = checks.len(), "Running checks");
    let started = Instant::now();
    let diagnostics = execute(objects, checks)?;
    let total = diagnostics.len();
    let diagnostics = diagnostic_filter.apply(diagnostics);

    info!(
        total,
        reported = diagnostics.len(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Checks complete"
    );

    Ok(CheckResult { diagnostics })
}

fn execute(objects: &Objects, checks: &[Arc<dyn Check>]) -> Result<Vec<Diagnostic>> {
    let collected: Mutex<Vec<Diagnostic>> = Mutex::new(Vec::new());

    let outcomes: Vec<Result<()>> = thread::scope(|scope| {
        let collected = &collected;
        let workers: Vec<_> = checks
            .iter()
            .map(|check| {
                thread::Builder::new()
                    .name(format!("check-{}", check.name()))
                    .spawn_scoped(scope, move || {
                        let diagnostics = run_one(check.as_ref(), objects)?;
                        // one append per check keeps its emission order intact
                        collected.lock().extend(diagnostics);
                        Ok(())
                    })
                    .map_err(|e| {
                        LintError::Internal(format!(
                            "failed to spawn worker for check {}: {e}",
                            check.name()
                        ))
                    })
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| {
                worker.and_then(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(LintError::Internal("check worker panicked".into()))
                    })
                })
            })
            .collect()
    });

    if let Some(err) = outcomes.into_iter().find_map(Result::err) {
        return Err(err);
    }

    Ok(collected.into_inner())
}

/// Run one check, turning an error or a panic into [`LintError::CheckFailed`].
fn run_one(check: &dyn Check, objects: &Objects) -> Result<Vec<Diagnostic>> {
    let name = check.name();
    debug!(check = name, "Running check");

    match catch_unwind(AssertUnwindSafe(|| check.run(objects))) {
        Ok(Ok(diagnostics)) => {
            debug!(check = name, diagnostics = diagnostics.len(), "Check finished");
            Ok(diagnostics)
        }
        Ok(Err(e)) => {
            error!(check = name, error = %e, "Check returned an error");
            Err(LintError::CheckFailed {
                check: name.to_string(),
                message: e.to_string(),
            })
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(check = name, panic = %message, "Check panicked");
            Err(LintError::CheckFailed {
                check: name.to_string(),
                message: format!("panic: {message}"),
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
