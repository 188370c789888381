//! Built-in checks for clusterlint.
//!
//! Every check is a unit struct implementing [`Check`]. The binary
//! registers them all at start-up with [`register_all`]; the order is fixed
//! so that registration is deterministic.
//!
//! | Group | Checks |
//! |-------|--------|
//! | `basic` | bare-pods, fully-qualified-image, latest-tag, default-namespace, node-name-pod-selector, resource-requirements, missing-probes, cronjob-concurrency, dangling-service, hostpath-volume, unused-* |
//! | `security` | privileged-containers, non-root-user, host-namespaces, privilege-escalation, hostpath-volume |
//! | `unused` | unused-config-map, unused-secret, unused-pv, unused-pvc |
//! | `admission` | admission-controller-webhook, admission-controller-webhook-timeout, admission-controller-webhook-replacement |
//! | `storage` | default-storage-class, missing-storage-class, volume-snapshot-validity |
//! | `nodes` | node-not-ready |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::sync::Arc;

use clusterlint_core::{Check, Registry, Result};

pub mod admission;
pub mod basic;
pub mod nodes;
pub mod security;
pub mod storage;
pub mod unused;
pub mod util;

/// Group names used by the built-in checks.
pub mod group {
    /// Everyday hygiene checks.
    pub const BASIC: &str = "basic";
    /// Pod security settings.
    pub const SECURITY: &str = "security";
    /// Objects nothing refers to.
    pub const UNUSED: &str = "unused";
    /// Admission webhook configuration.
    pub const ADMISSION: &str = "admission";
    /// Storage classes, claims and snapshots.
    pub const STORAGE: &str = "storage";
    /// Node health.
    pub const NODES: &str = "nodes";
}

/// Every built-in check, in registration order.
#[must_use]
pub fn builtin_checks() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(basic::BarePods),
        Arc::new(basic::FullyQualifiedImage),
        Arc::new(basic::LatestTag),
        Arc::new(basic::DefaultNamespace),
        Arc::new(basic::NodeNamePodSelector),
        Arc::new(basic::ResourceRequirements),
        Arc::new(basic::MissingProbes),
        Arc::new(basic::CronJobConcurrency),
        Arc::new(basic::DanglingService),
        Arc::new(security::HostPathVolume),
        Arc::new(unused::UnusedConfigMap),
        Arc::new(unused::UnusedSecret),
        Arc::new(unused::UnusedPersistentVolume),
        Arc::new(unused::UnusedPersistentVolumeClaim),
        Arc::new(security::PrivilegedContainers),
        Arc::new(security::NonRootUser),
        Arc::new(security::HostNamespaces),
        Arc::new(security::PrivilegeEscalation),
        Arc::new(admission::WebhookTarget),
        Arc::new(admission::WebhookTimeout),
        Arc::new(admission::WebhookReplacement),
        Arc::new(storage::DefaultStorageClass),
        Arc::new(storage::MissingStorageClass),
        Arc::new(storage::VolumeSnapshotValidity),
        Arc::new(nodes::NodeNotReady),
    ]
}

/// Register every built-in check.
///
/// # Errors
///
/// Returns [`LintError::DuplicateCheck`](clusterlint_core::LintError::DuplicateCheck)
/// if any built-in name is already registered.
pub fn register_all(registry: &Registry) -> Result<()> {
    for check in builtin_checks() {
        registry.register(check)?;
    }
    tracing::debug!(checks = registry.len(), "Registered built-in checks");
    Ok(())
}
