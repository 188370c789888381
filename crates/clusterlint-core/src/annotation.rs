//! Per-object check suppression.
//!
//! Any object may carry `clusterlint.digitalocean.com/disabled-checks` with a
//! comma-separated list of check names. Diagnostics from those checks on
//! that object are dropped after the run.

use crate::diagnostic::ObjectRef;

/// Annotation key listing checks disabled for an object.
pub const DISABLED_CHECKS_ANNOTATION: &str = "clusterlint.digitalocean.com/disabled-checks";

/// Whether `check` is enabled for the given object.
///
/// Returns `false` only when the object carries the disable annotation and
/// the comma-separated list (entries trimmed) contains `check` exactly.
#[must_use]
pub fn is_enabled(check: &str, object: &ObjectRef) -> bool {
    object
        .annotations
        .get(DISABLED_CHECKS_ANNOTATION)
        .is_none_or(|value| !value.split(',').any(|name| name.trim() == check))
}
