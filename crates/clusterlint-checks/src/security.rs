//! Pod security settings.

use clusterlint_core::{Check, CheckError, Diagnostic, Kind, Objects, Severity};
use k8s_openapi::api::core::v1::{Container, Pod};

use crate::group;
use crate::util;

/// Run `check` on every container, emitting one diagnostic per message it
/// returns.
fn per_container<F>(
    name: &str,
    severity: Severity,
    objects: &Objects,
    mut check: F,
) -> Vec<Diagnostic>
where
    F: FnMut(&Pod, &Container) -> Option<String>,
{
    let mut diagnostics = Vec::new();
    for pod in &objects.pods {
        for container in util::pod_containers(pod) {
            if let Some(message) = check(pod, container) {
                diagnostics.push(Diagnostic::new(
                    name,
                    severity,
                    Kind::Pod,
                    &pod.metadata,
                    message,
                ));
            }
        }
    }
    diagnostics
}

/// Flags containers running in privileged mode.
pub struct PrivilegedContainers;

impl Check for PrivilegedContainers {
    fn name(&self) -> &str {
        "privileged-containers"
    }

    fn groups(&self) -> &[&str] {
        &[group::SECURITY]
    }

    fn description(&self) -> &str {
        "Checks for containers running in privileged mode"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        Ok(per_container(self.name(), Severity::Warning, objects, |_, c| {
            let privileged = c
                .security_context
                .as_ref()
                .and_then(|sc| sc.privileged)
                .unwrap_or(false);
            privileged.then(|| format!("Privileged container '{}' found", c.name))
        }))
    }
}

/// Flags containers that may run as root.
pub struct NonRootUser;

impl Check for NonRootUser {
    fn name(&self) -> &str {
        "non-root-user"
    }

    fn groups(&self) -> &[&str] {
        &[group::SECURITY]
    }

    fn description(&self) -> &str {
        "Checks for containers that do not enforce a non-root user"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        Ok(per_container(self.name(), Severity::Warning, objects, |pod, c| {
            // Container settings override the pod's.
            let non_root = c
                .security_context
                .as_ref()
                .and_then(|sc| sc.run_as_non_root)
                .or_else(|| {
                    pod.spec
                        .as_ref()
                        .and_then(|s| s.security_context.as_ref())
                        .and_then(|sc| sc.run_as_non_root)
                });
            (non_root != Some(true))
                .then(|| format!("Container '{}' can run as root user", c.name))
        }))
    }
}

/// Flags containers that do not forbid privilege escalation.
pub struct PrivilegeEscalation;

impl Check for PrivilegeEscalation {
    fn name(&self) -> &str {
        "privilege-escalation"
    }

    fn groups(&self) -> &[&str] {
        &[group::SECURITY]
    }

    fn description(&self) -> &str {
        "Checks for containers that allow privilege escalation"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        Ok(per_container(self.name(), Severity::Suggestion, objects, |_, c| {
            let forbidden = c
                .security_context
                .as_ref()
                .and_then(|sc| sc.allow_privilege_escalation)
                == Some(false);
            (!forbidden).then(|| {
                format!(
                    "Set allowPrivilegeEscalation to false for container '{}'",
                    c.name
                )
            })
        }))
    }
}

/// Flags pods sharing the host's network, PID or IPC namespace.
pub struct HostNamespaces;

impl Check for HostNamespaces {
    fn name(&self) -> &str {
        "host-namespaces"
    }

    fn groups(&self) -> &[&str] {
        &[group::SECURITY]
    }

    fn description(&self) -> &str {
        "Checks for pods using host namespaces"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let mut diagnostics = Vec::new();
        for pod in &objects.pods {
            let Some(spec) = &pod.spec else { continue };
            let shared = [
                (spec.host_network, "network"),
                (spec.host_pid, "PID"),
                (spec.host_ipc, "IPC"),
            ];
            for (_, namespace) in shared.iter().filter(|(on, _)| *on == Some(true)) {
                diagnostics.push(Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Kind::Pod,
                    &pod.metadata,
                    format!("Pod is configured to use the host's {namespace} namespace"),
                ));
            }
        }
        Ok(diagnostics)
    }
}

/// Flags pods mounting directories of the host.
pub struct HostPathVolume;

impl Check for HostPathVolume {
    fn name(&self) -> &str {
        "hostpath-volume"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC, group::SECURITY]
    }

    fn description(&self) -> &str {
        "Checks for pods with hostPath volumes"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let mut diagnostics = Vec::new();
        for pod in &objects.pods {
            let volumes = pod.spec.iter().flat_map(|s| s.volumes.iter().flatten());
            for volume in volumes.filter(|v| v.host_path.is_some()) {
                diagnostics.push(Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Kind::Pod,
                    &pod.metadata,
                    format!("Avoid using hostPath for volume '{}'", volume.name),
                ));
            }
        }
        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::fixtures::{container, pod, with_volumes};
    use k8s_openapi::api::core::v1::{
        HostPathVolumeSource, PodSecurityContext, SecurityContext, Volume,
    };

    fn secured(name: &str, context: SecurityContext) -> Container {
        let mut c = container(name, "app:1");
        c.security_context = Some(context);
        c
    }

    fn objects(pod: Pod) -> Objects {
        Objects {
            pods: vec![pod],
            ..Default::default()
        }
    }

    #[test]
    fn privileged() {
        let objects = objects(pod(
            "node-agent",
            "ops",
            vec![
                secured(
                    "agent",
                    SecurityContext {
                        privileged: Some(true),
                        ..Default::default()
                    },
                ),
                container("sidecar", "envoy:1"),
            ],
        ));
        let diagnostics = PrivilegedContainers.run(&objects).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Privileged container 'agent' found");
    }

    #[test]
    fn non_root_inherits_from_pod() {
        let mut web = pod(
            "web",
            "prod",
            vec![
                container("app", "app:1"),
                secured(
                    "root-tool",
                    SecurityContext {
                        run_as_non_root: Some(false),
                        ..Default::default()
                    },
                ),
            ],
        );
        web.spec.as_mut().unwrap().security_context = Some(PodSecurityContext {
            run_as_non_root: Some(true),
            ..Default::default()
        });

        let diagnostics = NonRootUser.run(&objects(web)).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'root-tool'"));
    }

    #[test]
    fn privilege_escalation_must_be_disabled() {
        let objects = objects(pod(
            "web",
            "prod",
            vec![
                secured(
                    "locked",
                    SecurityContext {
                        allow_privilege_escalation: Some(false),
                        ..Default::default()
                    },
                ),
                container("open", "app:1"),
            ],
        ));
        let diagnostics = PrivilegeEscalation.run(&objects).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Suggestion);
        assert!(diagnostics[0].message.contains("'open'"));
    }

    #[test]
    fn host_namespaces() {
        let mut agent = pod("agent", "ops", vec![]);
        {
            let spec = agent.spec.as_mut().unwrap();
            spec.host_network = Some(true);
            spec.host_ipc = Some(true);
            spec.host_pid = Some(false);
        }
        let diagnostics = HostNamespaces.run(&objects(agent)).unwrap();
        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Pod is configured to use the host's network namespace",
                "Pod is configured to use the host's IPC namespace",
            ]
        );
    }

    #[test]
    fn host_path_volumes() {
        let volumes = vec![
            Volume {
                name: "docker-sock".to_string(),
                host_path: Some(HostPathVolumeSource {
                    path: "/var/run/docker.sock".to_string(),
                    type_: None,
                }),
                ..Default::default()
            },
            Volume {
                name: "scratch".to_string(),
                ..Default::default()
            },
        ];
        let objects = objects(with_volumes(pod("ci", "build", vec![]), volumes));

        let diagnostics = HostPathVolume.run(&objects).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'docker-sock'"));
    }

    #[test]
    fn pods_without_spec_are_skipped() {
        let objects = Objects {
            pods: vec![Pod::default()],
            ..Default::default()
        };
        assert!(HostNamespaces.run(&objects).unwrap().is_empty());
        assert!(HostPathVolume.run(&objects).unwrap().is_empty());
        assert!(NonRootUser.run(&objects).unwrap().is_empty());
    }
}
