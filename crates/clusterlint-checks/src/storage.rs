//! Storage classes, claims and snapshots.

use std::collections::HashSet;

use clusterlint_core::{Check, CheckError, Diagnostic, Kind, Objects, Severity};

use crate::group;
use crate::util;

/// Flags clusters with more than one default storage class.
pub struct DefaultStorageClass;

impl Check for DefaultStorageClass {
    fn name(&self) -> &str {
        "default-storage-class"
    }

    fn groups(&self) -> &[&str] {
        &[group::STORAGE]
    }

    fn description(&self) -> &str {
        "Checks that at most one storage class is marked as default"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let defaults: Vec<_> = objects.default_storage_classes().collect();
        if defaults.len() <= 1 {
            return Ok(Vec::new());
        }

        let names = defaults
            .iter()
            .map(|sc| util::name(&sc.metadata))
            .collect::<Vec<_>>()
            .join(", ");
        let diagnostics = defaults
            .iter()
            .map(|sc| {
                Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Kind::StorageClass,
                    &sc.metadata,
                    format!("Multiple default storage classes found: {names}"),
                )
            })
            .collect();
        Ok(diagnostics)
    }
}

/// Flags claims that name a storage class the cluster does not have.
pub struct MissingStorageClass;

impl Check for MissingStorageClass {
    fn name(&self) -> &str {
        "missing-storage-class"
    }

    fn groups(&self) -> &[&str] {
        &[group::STORAGE]
    }

    fn description(&self) -> &str {
        "Checks for persistent volume claims referencing a missing storage class"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let classes: HashSet<&str> = objects
            .storage_classes
            .iter()
            .map(|sc| util::name(&sc.metadata))
            .collect();

        let mut diagnostics = Vec::new();
        for pvc in &objects.persistent_volume_claims {
            // An empty class name requests a volume without dynamic provisioning.
            let Some(class) = pvc
                .spec
                .as_ref()
                .and_then(|s| s.storage_class_name.as_deref())
                .filter(|c| !c.is_empty())
            else {
                continue;
            };
            if !classes.contains(class) {
                diagnostics.push(Diagnostic::new(
                    self.name(),
                    Severity::Error,
                    Kind::PersistentVolumeClaim,
                    &pvc.metadata,
                    format!("Storage class '{class}' does not exist"),
                ));
            }
        }
        Ok(diagnostics)
    }
}

/// Flags volume snapshots that cannot be restored from.
pub struct VolumeSnapshotValidity;

impl Check for VolumeSnapshotValidity {
    fn name(&self) -> &str {
        "volume-snapshot-validity"
    }

    fn groups(&self) -> &[&str] {
        &[group::STORAGE]
    }

    fn description(&self) -> &str {
        "Checks for volume snapshots without a source or with an error status"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let mut diagnostics = Vec::new();
        for snapshot in &objects.volume_snapshots {
            let source = &snapshot.spec.source;
            if source.persistent_volume_claim_name.is_none()
                && source.volume_snapshot_content_name.is_none()
            {
                diagnostics.push(Diagnostic::new(
                    self.name(),
                    Severity::Error,
                    Kind::VolumeSnapshot,
                    &snapshot.metadata,
                    "Volume snapshot has no source",
                ));
            }

            if let Some(error) = snapshot.status.as_ref().and_then(|s| s.error.as_ref()) {
                let detail = error.message.as_deref().unwrap_or("unknown error");
                diagnostics.push(Diagnostic::new(
                    self.name(),
                    Severity::Error,
                    Kind::VolumeSnapshot,
                    &snapshot.metadata,
                    format!("Volume snapshot is in error state: {detail}"),
                ));
            }
        }
        Ok(diagnostics)
    }
}
