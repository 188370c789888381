//! The fetch boundary.
//!
//! The engine needs exactly one capability from the outside world: a fully
//! populated [`Objects`] snapshot, optionally narrowed by namespace. How the
//! snapshot is obtained (API server, fixture files, tests) is up to the
//! implementation.

use async_trait::async_trait;

use crate::filter::ObjectFilter;
use crate::objects::Objects;
use crate::Result;

/// Source of cluster object snapshots.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Fetch every collection the checks need.
    ///
    /// Implementations may use [`ObjectFilter::field_selector`] to narrow
    /// namespaced list calls; the engine applies [`ObjectFilter::apply`]
    /// afterwards either way.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::Fetch`](crate::LintError::Fetch) if any
    /// collection cannot be retrieved. No partial snapshot is returned.
    async fn fetch_objects(&self, filter: &ObjectFilter) -> Result<Objects>;
}

/// A fetcher serving a fixed snapshot, for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use crate::LintError;
    use parking_lot::Mutex;

    /// Returns a clone of a fixed snapshot, or a fixed fetch error.
    #[derive(Debug, Default)]
    pub struct StaticFetcher {
        objects: Objects,
        error: Option<String>,
        selectors: Mutex<Vec<Option<String>>>,
    }

    impl StaticFetcher {
        /// Serve the given snapshot.
        #[must_use]
        pub fn new(objects: Objects) -> Self {
            Self {
                objects,
                ..Default::default()
            }
        }

        /// Fail every fetch with the given message.
        #[must_use]
        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                error: Some(message.into()),
                ..Default::default()
            }
        }

        /// Field selectors seen by previous fetches, in call order.
        #[must_use]
        pub fn selectors(&self) -> Vec<Option<String>> {
            self.selectors.lock().clone()
        }
    }

    #[async_trait]
    impl ObjectFetcher for StaticFetcher {
        async fn fetch_objects(&self, filter: &ObjectFilter) -> Result<Objects> {
            self.selectors.lock().push(filter.field_selector());
            match &self.error {
                Some(message) => Err(LintError::Fetch(message.clone())),
                None => Ok(self.objects.clone()),
            }
        }
    }
}
