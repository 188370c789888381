//! Diagnostic model.
//!
//! A [`Diagnostic`] is one rule violation reported by a check. It copies the
//! identifying metadata of the offending object out of the snapshot so that
//! nothing borrows from the snapshot once a check returns.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use serde::{Deserialize, Serialize};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed.
    Error,
    /// Should be fixed.
    Warning,
    /// Worth considering.
    Suggestion,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Self; 3] = [Self::Error, Self::Warning, Self::Suggestion];

    /// Parse a severity from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "suggestion" => Some(Self::Suggestion),
            _ => None,
        }
    }

    /// Get the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Suggestion => "suggestion",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of Kubernetes resource a diagnostic points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// `v1/Pod`
    Pod,
    /// `v1/PodTemplate`
    PodTemplate,
    /// `v1/PersistentVolumeClaim`
    PersistentVolumeClaim,
    /// `v1/PersistentVolume`
    PersistentVolume,
    /// `v1/ConfigMap`
    ConfigMap,
    /// `v1/Service`
    Service,
    /// `v1/Secret`
    Secret,
    /// `v1/ServiceAccount`
    ServiceAccount,
    /// `v1/Node`
    Node,
    /// `v1/Namespace`
    Namespace,
    /// `v1/ResourceQuota`
    ResourceQuota,
    /// `v1/LimitRange`
    LimitRange,
    /// `storage.k8s.io/v1/StorageClass`
    StorageClass,
    /// `batch/v1/CronJob`
    CronJob,
    /// `snapshot.storage.k8s.io/v1/VolumeSnapshot`
    VolumeSnapshot,
    /// `admissionregistration.k8s.io/v1/ValidatingWebhookConfiguration`
    ValidatingWebhookConfiguration,
    /// `admissionregistration.k8s.io/v1/MutatingWebhookConfiguration`
    MutatingWebhookConfiguration,
}

impl Kind {
    /// Get the Kubernetes kind name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "Pod",
            Self::PodTemplate => "PodTemplate",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::PersistentVolume => "PersistentVolume",
            Self::ConfigMap => "ConfigMap",
            Self::Service => "Service",
            Self::Secret => "Secret",
            Self::ServiceAccount => "ServiceAccount",
            Self::Node => "Node",
            Self::Namespace => "Namespace",
            Self::ResourceQuota => "ResourceQuota",
            Self::LimitRange => "LimitRange",
            Self::StorageClass => "StorageClass",
            Self::CronJob => "CronJob",
            Self::VolumeSnapshot => "VolumeSnapshot",
            Self::ValidatingWebhookConfiguration => "ValidatingWebhookConfiguration",
            Self::MutatingWebhookConfiguration => "MutatingWebhookConfiguration",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifying metadata of the object a diagnostic refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Object name.
    pub name: String,
    /// Namespace, `None` for cluster-scoped objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Object annotations at the time of the fetch.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectRef {
    /// Create a reference with just a name and namespace.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.map(str::to_string),
            annotations: BTreeMap::new(),
        }
    }

    /// Copy the identifying fields out of an `ObjectMeta`.
    #[must_use]
    pub fn from_meta(meta: &ObjectMeta) -> Self {
        Self {
            name: meta.name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone(),
            annotations: meta.annotations.clone().unwrap_or_default(),
        }
    }
}

impl From<&ObjectMeta> for ObjectRef {
    fn from(meta: &ObjectMeta) -> Self {
        Self::from_meta(meta)
    }
}

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Name of the check that produced this diagnostic.
    pub check: String,
    /// Severity of the violation.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Kind of the offending object.
    pub kind: Kind,
    /// The offending object.
    pub object: ObjectRef,
    /// Owner references of the offending object, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<OwnerReference>,
}

impl Diagnostic {
    /// Create a diagnostic for an object, copying its owner references.
    #[must_use]
    pub fn new(
        check: impl Into<String>,
        severity: Severity,
        kind: Kind,
        meta: &ObjectMeta,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            severity,
            message: message.into(),
            kind,
            object: ObjectRef::from_meta(meta),
            owners: meta.owner_references.clone().unwrap_or_default(),
        }
    }

    /// Create a diagnostic from an existing object reference, without owners.
    #[must_use]
    pub fn with_object(
        check: impl Into<String>,
        severity: Severity,
        kind: Kind,
        object: ObjectRef,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            severity,
            message: message.into(),
            kind,
            object,
            owners: Vec::new(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object.namespace {
            Some(ns) => write!(
                f,
                "[{}] {}/{}/{}: {}",
                self.severity, ns, self.kind, self.object.name, self.message
            ),
            None => write!(
                f,
                "[{}] {}/{}: {}",
                self.severity, self.kind, self.object.name, self.message
            ),
        }
    }
}
