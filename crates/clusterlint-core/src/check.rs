//! The `Check` trait.

use crate::diagnostic::Diagnostic;
use crate::error::CheckError;
use crate::objects::Objects;

/// A named, stateless rule evaluated against a snapshot of cluster objects.
///
/// Implementations must not mutate shared state: the engine runs every
/// selected check concurrently against the same [`Objects`]. `run` must
/// treat every collection as possibly empty and copy whatever metadata it
/// reports into the returned diagnostics.
pub trait Check: Send + Sync {
    /// Unique name of the check, e.g. `bare-pods`.
    fn name(&self) -> &str;

    /// Groups the check belongs to.
    fn groups(&self) -> &[&str];

    /// One-line description shown by `clusterlint list`.
    fn description(&self) -> &str;

    /// Evaluate the check.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot evaluate the snapshot.
    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError>;
}

impl std::fmt::Debug for dyn Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name())
            .field("groups", &self.groups())
            .finish()
    }
}
