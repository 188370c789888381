//! The snapshot of cluster objects that checks run against.
//!
//! An [`Objects`] value is built once per run by an
//! [`ObjectFetcher`](crate::ObjectFetcher), then shared read-only across every
//! check by shared reference. Nothing hands out mutable access after the
//! post-fetch namespace filter has been applied.

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration,
};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{
    ConfigMap, LimitRange, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod,
    PodTemplate, ResourceQuota, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

use crate::filter::ObjectFilter;

/// Annotation marking a storage class as the cluster default.
pub const DEFAULT_STORAGE_CLASS_ANNOTATION: &str = "storageclass.kubernetes.io/is-default-class";

/// Name of the namespace holding cluster system components.
pub const SYSTEM_NAMESPACE: &str = "kube-system";

/// All cluster objects fetched for one lint run.
#[derive(Debug, Clone, Default)]
pub struct Objects {
    /// Cluster nodes.
    pub nodes: Vec<Node>,
    /// Persistent volumes.
    pub persistent_volumes: Vec<PersistentVolume>,
    /// Persistent volume claims.
    pub persistent_volume_claims: Vec<PersistentVolumeClaim>,
    /// Pods.
    pub pods: Vec<Pod>,
    /// Pod templates.
    pub pod_templates: Vec<PodTemplate>,
    /// Config maps.
    pub config_maps: Vec<ConfigMap>,
    /// Services.
    pub services: Vec<Service>,
    /// Secrets.
    pub secrets: Vec<Secret>,
    /// Service accounts.
    pub service_accounts: Vec<ServiceAccount>,
    /// Resource quotas.
    pub resource_quotas: Vec<ResourceQuota>,
    /// Limit ranges.
    pub limit_ranges: Vec<LimitRange>,
    /// Storage classes.
    pub storage_classes: Vec<StorageClass>,
    /// Mutating admission webhook configurations.
    pub mutating_webhook_configurations: Vec<MutatingWebhookConfiguration>,
    /// Validating admission webhook configurations.
    pub validating_webhook_configurations: Vec<ValidatingWebhookConfiguration>,
    /// Namespaces.
    pub namespaces: Vec<Namespace>,
    /// Cron jobs.
    pub cron_jobs: Vec<CronJob>,
    /// CSI volume snapshots. Empty when the snapshot CRD is not installed.
    pub volume_snapshots: Vec<VolumeSnapshot>,
    /// The `kube-system` namespace, if it could be read.
    pub system_namespace: Option<Namespace>,
    /// Namespace filter the namespaced collections were narrowed by.
    ///
    /// Checks that cross-reference objects consult it before reporting a
    /// reference as missing, since the target may only have been filtered
    /// out.
    pub namespace_filter: ObjectFilter,
}

impl Objects {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of objects across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
            + self.persistent_volumes.len()
            + self.persistent_volume_claims.len()
            + self.pods.len()
            + self.pod_templates.len()
            + self.config_maps.len()
            + self.services.len()
            + self.secrets.len()
            + self.service_accounts.len()
            + self.resource_quotas.len()
            + self.limit_ranges.len()
            + self.storage_classes.len()
            + self.mutating_webhook_configurations.len()
            + self.validating_webhook_configurations.len()
            + self.namespaces.len()
            + self.cron_jobs.len()
            + self.volume_snapshots.len()
    }

    /// Whether the snapshot holds no objects at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage classes annotated as the cluster default.
    pub fn default_storage_classes(&self) -> impl Iterator<Item = &StorageClass> {
        self.storage_classes.iter().filter(|sc| {
            sc.metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(DEFAULT_STORAGE_CLASS_ANNOTATION))
                .is_some_and(|v| v == "true")
        })
    }
}

/// Spec of a CSI `VolumeSnapshot`.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize)]
#[kube(
    group = "snapshot.storage.k8s.io",
    version = "v1",
    kind = "VolumeSnapshot",
    namespaced,
    status = "VolumeSnapshotStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotSpec {
    /// Where the snapshot is taken from.
    #[serde(default)]
    pub source: VolumeSnapshotSource,
    /// Snapshot class to use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_snapshot_class_name: Option<String>,
}

/// Source of a volume snapshot; exactly one field should be set.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotSource {
    /// Claim to snapshot dynamically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim_name: Option<String>,
    /// Pre-provisioned snapshot content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_snapshot_content_name: Option<String>,
}

/// Observed state of a volume snapshot.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotStatus {
    /// Whether the snapshot can be restored from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_to_use: Option<bool>,
    /// Bound snapshot content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_volume_snapshot_content_name: Option<String>,
    /// Minimum size of a volume restored from this snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_size: Option<String>,
    /// Last error reported by the snapshot controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<VolumeSnapshotError>,
}

/// Error reported on a volume snapshot.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct VolumeSnapshotError {
    /// Error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Time the error occurred (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}
