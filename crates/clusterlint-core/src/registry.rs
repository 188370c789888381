//! Check registry.
//!
//! The registry maps check names to implementations and group names to the
//! checks tagged with them. It is populated once at start-up and read-mostly
//! afterwards, so both tables sit behind a single reader/writer lock.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::check::Check;
use crate::{LintError, Result};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

#[derive(Default)]
struct Tables {
    checks: HashMap<String, Arc<dyn Check>>,
    groups: HashMap<String, Vec<Arc<dyn Check>>>,
}

/// A table of registered checks, indexed by name and by group.
#[derive(Default)]
pub struct Registry {
    tables: RwLock<Tables>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first use.
    ///
    /// The binary populates it once through an explicit assembly function;
    /// library code and tests should prefer a private [`Registry::new`].
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::new)
    }

    /// Register a check.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::EmptyCheckName`] if the name is empty and
    /// [`LintError::DuplicateCheck`] if a check with the same name is
    /// already registered. The registry is left unchanged on error.
    pub fn register(&self, check: Arc<dyn Check>) -> Result<()> {
        let name = check.name().to_string();
        if name.is_empty() {
            return Err(LintError::EmptyCheckName);
        }

        let mut tables = self.tables.write();
        if tables.checks.contains_key(&name) {
            return Err(LintError::DuplicateCheck(name));
        }

        for group in check.groups() {
            let members = tables.groups.entry((*group).to_string()).or_default();
            if !members.iter().any(|c| c.name() == name) {
                members.push(Arc::clone(&check));
            }
        }
        debug!(check = %name, groups = ?check.groups(), "Registered check");
        tables.checks.insert(name, check);

        Ok(())
    }

    /// All registered checks, in no particular order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<dyn Check>> {
        self.tables.read().checks.values().cloned().collect()
    }

    /// Names of all groups that have at least one check.
    #[must_use]
    pub fn list_groups(&self) -> Vec<String> {
        self.tables.read().groups.keys().cloned().collect()
    }

    /// Checks in the named group; an unknown group yields an empty list.
    #[must_use]
    pub fn get_group(&self, name: &str) -> Vec<Arc<dyn Check>> {
        self.tables
            .read()
            .groups
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Union of the named groups. Unknown names are skipped and a check in
    /// several of the groups is returned once.
    #[must_use]
    pub fn get_groups<S: AsRef<str>>(&self, names: &[S]) -> Vec<Arc<dyn Check>> {
        let tables = self.tables.read();
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        for name in names {
            let Some(checks) = tables.groups.get(name.as_ref()) else {
                continue;
            };
            for check in checks {
                if seen.insert(check.name().to_string()) {
                    result.push(Arc::clone(check));
                }
            }
        }

        result
    }

    /// Look up a check by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::CheckNotFound`] if no such check is registered.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Check>> {
        self.tables
            .read()
            .checks
            .get(name)
            .cloned()
            .ok_or_else(|| LintError::CheckNotFound(name.to_string()))
    }

    /// Number of registered checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.read().checks.len()
    }

    /// Whether no checks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.read().checks.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("Registry")
            .field("checks", &tables.checks.len())
            .field("groups", &tables.groups.len())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FixedCheck;
    use super::*;

    fn names(checks: &[Arc<dyn Check>]) -> HashSet<String> {
        checks.iter().map(|c| c.name().to_string()).collect()
    }

    fn sample_registry() -> Registry {
        let registry = Registry::new();
        registry
            .register(Arc::new(FixedCheck::new("bare-pods", &["basic"])))
            .unwrap();
        registry
            .register(Arc::new(FixedCheck::new("privileged", &["security"])))
            .unwrap();
        registry
            .register(Arc::new(FixedCheck::new("hostpath", &["basic", "security"])))
            .unwrap();
        registry
    }

    #[test]
    fn register_and_get() {
        let registry = sample_registry();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("bare-pods").unwrap().name(), "bare-pods");
        assert!(matches!(
            registry.get("missing"),
            Err(LintError::CheckNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn register_rejects_empty_name() {
        let registry = Registry::new();
        let err = registry
            .register(Arc::new(FixedCheck::new("", &["basic"])))
            .unwrap_err();
        assert!(matches!(err, LintError::EmptyCheckName));
        assert!(registry.is_empty());
        assert!(registry.list_groups().is_empty());
    }

    #[test]
    fn register_rejects_duplicate_and_keeps_first() {
        let registry = Registry::new();
        registry
            .register(Arc::new(FixedCheck::new("bare-pods", &["basic"])))
            .unwrap();
        let err = registry
            .register(Arc::new(FixedCheck::new("bare-pods", &["security"])))
            .unwrap_err();

        assert!(err.to_string().contains("already exists"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("bare-pods").unwrap().groups(), &["basic"]);
        assert!(registry.get_group("security").is_empty());
    }

    #[test]
    fn groups_index() {
        let registry = sample_registry();

        let mut groups = registry.list_groups();
        groups.sort();
        assert_eq!(groups, vec!["basic", "security"]);

        assert_eq!(
            names(&registry.get_group("basic")),
            HashSet::from(["bare-pods".to_string(), "hostpath".to_string()])
        );
        assert!(registry.get_group("unknown").is_empty());
    }

    #[test]
    fn repeated_group_is_indexed_once() {
        let registry = Registry::new();
        registry
            .register(Arc::new(FixedCheck::new("hostpath", &["security", "security"])))
            .unwrap();

        assert_eq!(registry.get_group("security").len(), 1);
        assert_eq!(registry.list_groups(), vec!["security"]);
    }

    #[test]
    fn get_groups_skips_unknown_and_dedupes() {
        let registry = sample_registry();
        let checks = registry.get_groups(&["basic", "nope", "security"]);
        assert_eq!(checks.len(), 3);
        assert_eq!(
            names(&checks),
            HashSet::from([
                "bare-pods".to_string(),
                "privileged".to_string(),
                "hostpath".to_string()
            ])
        );
    }

    #[test]
    fn concurrent_registration() {
        const NAMES: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let registry = Registry::new();

        std::thread::scope(|scope| {
            for name in NAMES {
                let registry = &registry;
                scope.spawn(move || {
                    registry
                        .register(Arc::new(FixedCheck::new(name, &["all"])))
                        .unwrap();
                });
            }
        });

        assert_eq!(registry.len(), NAMES.len());
        assert_eq!(registry.get_group("all").len(), NAMES.len());
    }

    #[test]
    fn global_is_a_singleton() {
        assert!(std::ptr::eq(Registry::global(), Registry::global()));
    }
}
