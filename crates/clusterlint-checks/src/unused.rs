//! Objects that nothing in the cluster refers to.
//!
//! Each check indexes the references found in pod specs (pods and pod
//! templates) into `(namespace, name)` sets, then probes every candidate
//! object against the index.

use std::collections::HashSet;

use clusterlint_core::{Check, CheckError, Diagnostic, Kind, Objects, Severity};
use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::group;
use crate::util;

/// Config map injected into every namespace by the control plane.
const ROOT_CA_CONFIG_MAP: &str = "kube-root-ca.crt";

const SERVICE_ACCOUNT_TOKEN: &str = "kubernetes.io/service-account-token";

type Key = (String, String);

/// Names referenced from pod specs, keyed by namespace.
#[derive(Debug, Default)]
struct References {
    config_maps: HashSet<Key>,
    secrets: HashSet<Key>,
    claims: HashSet<Key>,
}

impl References {
    fn collect(objects: &Objects) -> Self {
        let mut refs = Self::default();

        let pods = objects
            .pods
            .iter()
            .filter_map(|p| p.spec.as_ref().map(|s| (&p.metadata, s)));
        let templates = objects.pod_templates.iter().filter_map(|t| {
            t.template
                .as_ref()
                .and_then(|tpl| tpl.spec.as_ref())
                .map(|s| (&t.metadata, s))
        });
        for (meta, spec) in pods.chain(templates) {
            refs.add_pod_spec(util::namespace(meta), spec);
        }

        for sa in &objects.service_accounts {
            let ns = util::namespace(&sa.metadata);
            for secret in sa.secrets.iter().flatten() {
                if let Some(name) = &secret.name {
                    let ns = secret.namespace.as_deref().unwrap_or(ns);
                    refs.secrets.insert(util::key(ns, name));
                }
            }
            for secret in sa.image_pull_secrets.iter().flatten() {
                refs.secrets.insert(util::key(ns, &secret.name));
            }
        }

        refs
    }

    fn add_pod_spec(&mut self, ns: &str, spec: &PodSpec) {
        for volume in spec.volumes.iter().flatten() {
            if let Some(cm) = &volume.config_map {
                self.config_maps.insert(util::key(ns, &cm.name));
            }
            if let Some(name) = volume.secret.as_ref().and_then(|s| s.secret_name.as_ref()) {
                self.secrets.insert(util::key(ns, name));
            }
            if let Some(claim) = &volume.persistent_volume_claim {
                self.claims.insert(util::key(ns, &claim.claim_name));
            }
            let sources = volume
                .projected
                .as_ref()
                .and_then(|p| p.sources.as_ref())
                .into_iter()
                .flatten();
            for source in sources {
                if let Some(cm) = &source.config_map {
                    self.config_maps.insert(util::key(ns, &cm.name));
                }
                if let Some(secret) = &source.secret {
                    self.secrets.insert(util::key(ns, &secret.name));
                }
            }
        }

        for secret in spec.image_pull_secrets.iter().flatten() {
            self.secrets.insert(util::key(ns, &secret.name));
        }

        for container in util::containers(spec) {
            for env in container.env.iter().flatten() {
                let Some(from) = &env.value_from else { continue };
                if let Some(cm) = &from.config_map_key_ref {
                    self.config_maps.insert(util::key(ns, &cm.name));
                }
                if let Some(secret) = &from.secret_key_ref {
                    self.secrets.insert(util::key(ns, &secret.name));
                }
            }
            for source in container.env_from.iter().flatten() {
                if let Some(cm) = &source.config_map_ref {
                    self.config_maps.insert(util::key(ns, &cm.name));
                }
                if let Some(secret) = &source.secret_ref {
                    self.secrets.insert(util::key(ns, &secret.name));
                }
            }
        }
    }
}

fn is_referenced(index: &HashSet<Key>, meta: &ObjectMeta) -> bool {
    index.contains(&util::key(util::namespace(meta), util::name(meta)))
}

/// Flags config maps no pod mounts or reads.
pub struct UnusedConfigMap;

impl Check for UnusedConfigMap {
    fn name(&self) -> &str {
        "unused-config-map"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC, group::UNUSED]
    }

    fn description(&self) -> &str {
        "Checks for config maps not referenced by any pod"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let refs = References::collect(objects);
        let diagnostics = objects
            .config_maps
            .iter()
            .filter(|cm| util::name(&cm.metadata) != ROOT_CA_CONFIG_MAP)
            .filter(|cm| !is_referenced(&refs.config_maps, &cm.metadata))
            .map(|cm| {
                Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Kind::ConfigMap,
                    &cm.metadata,
                    format!("Unused config map '{}'", util::name(&cm.metadata)),
                )
            })
            .collect();
        Ok(diagnostics)
    }
}

/// Flags secrets no pod or service account refers to.
pub struct UnusedSecret;

impl Check for UnusedSecret {
    fn name(&self) -> &str {
        "unused-secret"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC, group::UNUSED]
    }

    fn description(&self) -> &str {
        "Checks for secrets not referenced by any pod or service account"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let refs = References::collect(objects);
        let diagnostics = objects
            .secrets
            .iter()
            .filter(|s| s.type_.as_deref() != Some(SERVICE_ACCOUNT_TOKEN))
            .filter(|s| !is_referenced(&refs.secrets, &s.metadata))
            .map(|s| {
                Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Kind::Secret,
                    &s.metadata,
                    format!("Unused secret '{}'", util::name(&s.metadata)),
                )
            })
            .collect();
        Ok(diagnostics)
    }
}

/// Flags persistent volumes that are not bound to a claim.
pub struct UnusedPersistentVolume;

impl Check for UnusedPersistentVolume {
    fn name(&self) -> &str {
        "unused-pv"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC, group::UNUSED]
    }

    fn description(&self) -> &str {
        "Checks for persistent volumes without a claim"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let diagnostics = objects
            .persistent_volumes
            .iter()
            .filter(|pv| pv.spec.as_ref().and_then(|s| s.claim_ref.as_ref()).is_none())
            .map(|pv| {
                Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Kind::PersistentVolume,
                    &pv.metadata,
                    format!("Unused persistent volume '{}'", util::name(&pv.metadata)),
                )
            })
            .collect();
        Ok(diagnostics)
    }
}

/// Flags persistent volume claims no pod mounts.
pub struct UnusedPersistentVolumeClaim;

impl Check for UnusedPersistentVolumeClaim {
    fn name(&self) -> &str {
        "unused-pvc"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC, group::UNUSED]
    }

    fn description(&self) -> &str {
        "Checks for persistent volume claims not mounted by any pod"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let refs = References::collect(objects);
        let diagnostics = objects
            .persistent_volume_claims
            .iter()
            .filter(|pvc| !is_referenced(&refs.claims, &pvc.metadata))
            .map(|pvc| {
                Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Kind::PersistentVolumeClaim,
                    &pvc.metadata,
                    format!(
                        "Unused persistent volume claim '{}'",
                        util::name(&pvc.metadata)
                    ),
                )
            })
            .collect();
        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::fixtures::{container, meta, pod, with_volumes};
    use k8s_openapi::api::core::v1::{
        ConfigMap, ConfigMapEnvSource, ConfigMapProjection, EnvFromSource, EnvVar,
        EnvVarSource, LocalObjectReference, ObjectReference, PersistentVolume,
        PersistentVolumeClaim, PersistentVolumeClaimVolumeSource, PersistentVolumeSpec,
        ProjectedVolumeSource, Secret, SecretKeySelector, ServiceAccount, Volume,
        VolumeProjection,
    };

    fn config_map(name: &str, namespace: &str) -> ConfigMap {
        ConfigMap {
            metadata: meta(name, namespace),
            ..Default::default()
        }
    }

    fn secret(name: &str, namespace: &str) -> Secret {
        Secret {
            metadata: meta(name, namespace),
            type_: Some("Opaque".to_string()),
            ..Default::default()
        }
    }

    fn claim(name: &str, namespace: &str) -> PersistentVolumeClaim {
        PersistentVolumeClaim {
            metadata: meta(name, namespace),
            ..Default::default()
        }
    }

    fn claim_volume(claim: &str) -> Volume {
        Volume {
            name: "data".to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim.to_string(),
                read_only: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn unreferenced_claim_is_reported_once() {
        let objects = Objects {
            persistent_volume_claims: vec![claim("data", "prod")],
            pods: vec![pod("web", "prod", vec![])],
            ..Default::default()
        };

        let diagnostics = UnusedPersistentVolumeClaim.run(&objects).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[0].kind, Kind::PersistentVolumeClaim);
        assert_eq!(diagnostics[0].message, "Unused persistent volume claim 'data'");
    }

    #[test]
    fn referenced_claim_is_used() {
        let objects = Objects {
            persistent_volume_claims: vec![claim("data", "prod")],
            pods: vec![with_volumes(pod("db", "prod", vec![]), vec![claim_volume("data")])],
            ..Default::default()
        };
        assert!(UnusedPersistentVolumeClaim.run(&objects).unwrap().is_empty());
    }

    #[test]
    fn claim_reference_is_namespace_scoped() {
        let objects = Objects {
            persistent_volume_claims: vec![claim("data", "prod")],
            pods: vec![with_volumes(pod("db", "staging", vec![]), vec![claim_volume("data")])],
            ..Default::default()
        };
        assert_eq!(UnusedPersistentVolumeClaim.run(&objects).unwrap().len(), 1);
    }

    #[test]
    fn config_map_used_through_env_from() {
        let mut app = container("app", "app:1");
        app.env_from = Some(vec![EnvFromSource {
            config_map_ref: Some(ConfigMapEnvSource {
                name: "settings".to_string(),
                optional: None,
            }),
            ..Default::default()
        }]);

        let objects = Objects {
            config_maps: vec![config_map("settings", "prod"), config_map("stale", "prod")],
            pods: vec![pod("web", "prod", vec![app])],
            ..Default::default()
        };

        let diagnostics = UnusedConfigMap.run(&objects).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].object.name, "stale");
    }

    #[test]
    fn config_map_used_through_projected_volume() {
        let volume = Volume {
            name: "bundle".to_string(),
            projected: Some(ProjectedVolumeSource {
                sources: Some(vec![VolumeProjection {
                    config_map: Some(ConfigMapProjection {
                        name: "ca-bundle".to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let objects = Objects {
            config_maps: vec![
                config_map("ca-bundle", "prod"),
                config_map(ROOT_CA_CONFIG_MAP, "prod"),
            ],
            pods: vec![with_volumes(pod("web", "prod", vec![]), vec![volume])],
            ..Default::default()
        };
        assert!(UnusedConfigMap.run(&objects).unwrap().is_empty());
    }

    #[test]
    fn secret_references() {
        let mut app = container("app", "app:1");
        app.env = Some(vec![EnvVar {
            name: "PASSWORD".to_string(),
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: "db".to_string(),
                    key: "password".to_string(),
                    optional: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);
        let mut web = pod("web", "prod", vec![app]);
        web.spec.as_mut().unwrap().image_pull_secrets = Some(vec![LocalObjectReference {
            name: "registry".to_string(),
        }]);

        let service_account = ServiceAccount {
            metadata: meta("deployer", "prod"),
            secrets: Some(vec![ObjectReference {
                name: Some("deploy-key".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let mut token = secret("deployer-token-abc", "prod");
        token.type_ = Some(SERVICE_ACCOUNT_TOKEN.to_string());

        let objects = Objects {
            secrets: vec![
                secret("db", "prod"),
                secret("registry", "prod"),
                secret("deploy-key", "prod"),
                secret("orphan", "prod"),
                token,
            ],
            pods: vec![web],
            service_accounts: vec![service_account],
            ..Default::default()
        };

        let diagnostics = UnusedSecret.run(&objects).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].object.name, "orphan");
    }

    #[test]
    fn unbound_volume() {
        let bound = PersistentVolume {
            metadata: meta("pv-bound", ""),
            spec: Some(PersistentVolumeSpec {
                claim_ref: Some(ObjectReference {
                    name: Some("data".to_string()),
                    namespace: Some("prod".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let free = PersistentVolume {
            metadata: meta("pv-free", ""),
            spec: Some(PersistentVolumeSpec::default()),
            ..Default::default()
        };

        let objects = Objects {
            persistent_volumes: vec![bound, free],
            ..Default::default()
        };
        let diagnostics = UnusedPersistentVolume.run(&objects).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].object.name, "pv-free");
        assert_eq!(diagnostics[0].object.namespace, None);
    }
}
