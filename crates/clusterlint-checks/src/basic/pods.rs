//! Pod shape checks: ownership, scheduling, resources and probes.

use clusterlint_core::{Check, CheckError, Diagnostic, Kind, Objects, Severity};
use k8s_openapi::api::core::v1::{Container, Pod};

use crate::group;
use crate::util;

/// Annotation the kubelet sets on mirror pods of static manifests.
const MIRROR_ANNOTATION: &str = "kubernetes.io/config.mirror";

/// Well-known label carrying the node's host name.
const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

/// Flags pods that no controller owns.
pub struct BarePods;

impl BarePods {
    fn is_static(pod: &Pod, objects: &Objects) -> bool {
        let mirrored = pod
            .metadata
            .annotations
            .as_ref()
            .is_some_and(|a| a.contains_key(MIRROR_ANNOTATION));
        if mirrored {
            return true;
        }

        // Static pods are named `<manifest>-<nodeName>`.
        let Some(node_name) = pod.spec.as_ref().and_then(|s| s.node_name.as_deref()) else {
            return false;
        };
        util::name(&pod.metadata).ends_with(&format!("-{node_name}"))
            && objects
                .nodes
                .iter()
                .any(|n| n.metadata.name.as_deref() == Some(node_name))
    }
}

impl Check for BarePods {
    fn name(&self) -> &str {
        "bare-pods"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC]
    }

    fn description(&self) -> &str {
        "Checks for pods without an owning controller"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let diagnostics = objects
            .pods
            .iter()
            .filter(|pod| pod.metadata.owner_references.as_ref().is_none_or(Vec::is_empty))
            .filter(|pod| !Self::is_static(pod, objects))
            .map(|pod| {
                Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Kind::Pod,
                    &pod.metadata,
                    "Avoid using bare pods in clusters",
                )
            })
            .collect();
        Ok(diagnostics)
    }
}

/// Flags pods pinned to a node through the host name label.
pub struct NodeNamePodSelector;

impl Check for NodeNamePodSelector {
    fn name(&self) -> &str {
        "node-name-pod-selector"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC]
    }

    fn description(&self) -> &str {
        "Checks for pods that select a node by its host name"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let diagnostics = objects
            .pods
            .iter()
            .filter(|pod| {
                pod.spec
                    .as_ref()
                    .and_then(|s| s.node_selector.as_ref())
                    .is_some_and(|sel| sel.contains_key(HOSTNAME_LABEL))
            })
            .map(|pod| {
                Diagnostic::new(
                    self.name(),
                    Severity::Suggestion,
                    Kind::Pod,
                    &pod.metadata,
                    "Avoid node name label for node selector",
                )
            })
            .collect();
        Ok(diagnostics)
    }
}

/// Flags containers without resource requests or limits.
pub struct ResourceRequirements;

impl ResourceRequirements {
    fn has_requirements(container: &Container) -> bool {
        container.resources.as_ref().is_some_and(|r| {
            r.requests.as_ref().is_some_and(|m| !m.is_empty())
                || r.limits.as_ref().is_some_and(|m| !m.is_empty())
        })
    }
}

impl Check for ResourceRequirements {
    fn name(&self) -> &str {
        "resource-requirements"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC]
    }

    fn description(&self) -> &str {
        "Checks for containers without resource requests or limits"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let mut diagnostics = Vec::new();
        for pod in &objects.pods {
            for container in util::pod_containers(pod) {
                if !Self::has_requirements(container) {
                    diagnostics.push(Diagnostic::new(
                        self.name(),
                        Severity::Warning,
                        Kind::Pod,
                        &pod.metadata,
                        format!(
                            "Set resource requests and limits for container '{}' to prevent resource contention",
                            container.name
                        ),
                    ));
                }
            }
        }
        Ok(diagnostics)
    }
}

/// Flags controller-owned pods whose containers have no health probes.
pub struct MissingProbes;

impl Check for MissingProbes {
    fn name(&self) -> &str {
        "missing-probes"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC]
    }

    fn description(&self) -> &str {
        "Checks for containers with neither a liveness nor a readiness probe"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let mut diagnostics = Vec::new();
        let owned = objects
            .pods
            .iter()
            .filter(|pod| pod.metadata.owner_references.as_ref().is_some_and(|o| !o.is_empty()));

        for pod in owned {
            // Init containers run to completion and take no probes.
            let Some(spec) = &pod.spec else { continue };
            for container in &spec.containers {
                if container.liveness_probe.is_none() && container.readiness_probe.is_none() {
                    diagnostics.push(Diagnostic::new(
                        self.name(),
                        Severity::Suggestion,
                        Kind::Pod,
                        &pod.metadata,
                        format!(
                            "Container '{}' has no liveness or readiness probe",
                            container.name
                        ),
                    ));
                }
            }
        }
        Ok(diagnostics)
    }
}
