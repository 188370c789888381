//! Cron job concurrency policy.

use clusterlint_core::{Check, CheckError, Diagnostic, Kind, Objects, Severity};

use crate::group;

/// Flags cron jobs that allow overlapping runs.
pub struct CronJobConcurrency;

impl Check for CronJobConcurrency {
    fn name(&self) -> &str {
        "cronjob-concurrency"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC]
    }

    fn description(&self) -> &str {
        "Checks for cron jobs that allow concurrent runs"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let diagnostics = objects
            .cron_jobs
            .iter()
            .filter(|job| {
                // Unset defaults to Allow.
                job.spec
                    .as_ref()
                    .and_then(|s| s.concurrency_policy.as_deref())
                    .is_none_or(|p| p == "Allow")
            })
            .map(|job| {
                Diagnostic::new(
                    self.name(),
                    Severity::Suggestion,
                    Kind::CronJob,
                    &job.metadata,
                    "CronJob has concurrencyPolicy `Allow`. Prefer `Forbid` or `Replace`",
                )
            })
            .collect();
        Ok(diagnostics)
    }
}
