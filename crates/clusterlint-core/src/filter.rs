//! Check, object and diagnostic filters.
//!
//! Filters are built once per invocation from include/exclude lists and are
//! immutable afterwards. Construction rejects configurations that name both
//! an include and an exclude list on the same axis.

use std::collections::HashSet;
use std::sync::Arc;

use kube::Resource;

use crate::annotation::is_enabled;
use crate::check::Check;
use crate::diagnostic::{Diagnostic, Severity};
use crate::objects::Objects;
use crate::registry::Registry;
use crate::{LintError, Result};

/// Selects which checks run, by group and by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckFilter {
    include_groups: Vec<String>,
    exclude_groups: Vec<String>,
    include_checks: Vec<String>,
    exclude_checks: Vec<String>,
}

impl CheckFilter {
    /// Build a check filter.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::ConflictingGroupFilters`] if both include and
    /// exclude groups are given, and [`LintError::ConflictingCheckFilters`]
    /// if both include and exclude checks are given.
    pub fn new(
        include_groups: Vec<String>,
        exclude_groups: Vec<String>,
        include_checks: Vec<String>,
        exclude_checks: Vec<String>,
    ) -> Result<Self> {
        if !include_groups.is_empty() && !exclude_groups.is_empty() {
            return Err(LintError::ConflictingGroupFilters);
        }
        if !include_checks.is_empty() && !exclude_checks.is_empty() {
            return Err(LintError::ConflictingCheckFilters);
        }

        Ok(Self {
            include_groups,
            exclude_groups,
            include_checks,
            exclude_checks,
        })
    }

    /// A filter that selects every registered check.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolve the effective check set against a registry.
    ///
    /// Groups are resolved first: included groups are unioned, excluded
    /// groups leave the union of every other group, and no group condition
    /// selects the whole registry. Names are applied on top: included names
    /// intersect, excluded names subtract. The result is deterministic as a
    /// set; its order is not.
    #[must_use]
    pub fn filter_checks(&self, registry: &Registry) -> Vec<Arc<dyn Check>> {
        let by_group = if !self.include_groups.is_empty() {
            registry.get_groups(&self.include_groups)
        } else if !self.exclude_groups.is_empty() {
            let remaining: Vec<String> = registry
                .list_groups()
                .into_iter()
                .filter(|g| !self.exclude_groups.contains(g))
                .collect();
            registry.get_groups(&remaining)
        } else {
            registry.list()
        };

        if !self.include_checks.is_empty() {
            let wanted: HashSet<&str> = self.include_checks.iter().map(String::as_str).collect();
            by_group
                .into_iter()
                .filter(|c| wanted.contains(c.name()))
                .collect()
        } else if !self.exclude_checks.is_empty() {
            let unwanted: HashSet<&str> = self.exclude_checks.iter().map(String::as_str).collect();
            by_group
                .into_iter()
                .filter(|c| !unwanted.contains(c.name()))
                .collect()
        } else {
            by_group
        }
    }
}

/// Selects which namespaces' objects are linted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectFilter {
    include_namespaces: Vec<String>,
    exclude_namespaces: Vec<String>,
}

impl ObjectFilter {
    /// Build a namespace filter.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::ConflictingNamespaceFilters`] if both lists are
    /// non-empty.
    pub fn new(include_namespaces: Vec<String>, exclude_namespaces: Vec<String>) -> Result<Self> {
        if !include_namespaces.is_empty() && !exclude_namespaces.is_empty() {
            return Err(LintError::ConflictingNamespaceFilters);
        }
        Ok(Self {
            include_namespaces,
            exclude_namespaces,
        })
    }

    /// A filter that keeps every namespace.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether the filter restricts anything at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include_namespaces.is_empty() && self.exclude_namespaces.is_empty()
    }

    /// Server-side field selector for namespaced list calls.
    ///
    /// Field selectors only support AND-combined terms, so several included
    /// namespaces cannot be expressed and yield `None`; those are handled by
    /// [`ObjectFilter::apply`] after the fetch.
    #[must_use]
    pub fn field_selector(&self) -> Option<String> {
        match (
            self.include_namespaces.as_slice(),
            self.exclude_namespaces.as_slice(),
        ) {
            ([namespace], []) => Some(format!("metadata.namespace={namespace}")),
            ([], exclude) if !exclude.is_empty() => Some(
                exclude
                    .iter()
                    .map(|ns| format!("metadata.namespace!={ns}"))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            _ => None,
        }
    }

    /// Whether an object in `namespace` passes the filter. Cluster-scoped
    /// objects (`None`) always pass.
    #[must_use]
    pub fn matches(&self, namespace: Option<&str>) -> bool {
        let Some(namespace) = namespace else {
            return true;
        };
        if !self.include_namespaces.is_empty() {
            return self.include_namespaces.iter().any(|ns| ns == namespace);
        }
        !self.exclude_namespaces.iter().any(|ns| ns == namespace)
    }

    /// Remove objects outside the selected namespaces from every namespaced
    /// collection of the snapshot.
    pub fn apply(&self, objects: &mut Objects) {
        objects.namespace_filter = self.clone();
        if self.is_empty() {
            return;
        }

        self.retain(&mut objects.pods);
        self.retain(&mut objects.pod_templates);
        self.retain(&mut objects.persistent_volume_claims);
        self.retain(&mut objects.config_maps);
        self.retain(&mut objects.services);
        self.retain(&mut objects.secrets);
        self.retain(&mut objects.service_accounts);
        self.retain(&mut objects.resource_quotas);
        self.retain(&mut objects.limit_ranges);
        self.retain(&mut objects.cron_jobs);
        self.retain(&mut objects.volume_snapshots);
    }

    /// Consume a snapshot and return it filtered.
    #[must_use]
    pub fn filter(&self, mut objects: Objects) -> Objects {
        self.apply(&mut objects);
        objects
    }

    fn retain<K: Resource>(&self, items: &mut Vec<K>) {
        items.retain(|item| self.matches(item.meta().namespace.as_deref()));
    }
}

/// Post-run filter over diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticFilter {
    /// Keep only diagnostics of exactly this severity; `None` keeps all.
    pub severity: Option<Severity>,
}

impl DiagnosticFilter {
    /// A filter keeping diagnostics of the given severity only.
    #[must_use]
    pub const fn with_severity(severity: Severity) -> Self {
        Self {
            severity: Some(severity),
        }
    }

    /// Drop diagnostics disabled by their object's annotation, then those
    /// not matching the requested severity.
    #[must_use]
    pub fn apply(&self, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        diagnostics
            .into_iter()
            .filter(|d| is_enabled(&d.check, &d.object))
            .filter(|d| self.severity.is_none_or(|s| d.severity == s))
            .collect()
    }
}
