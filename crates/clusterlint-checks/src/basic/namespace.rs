//! Objects living in the `default` namespace.

use clusterlint_core::{Check, CheckError, Diagnostic, Kind, Objects, Severity};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::group;
use crate::util;

const DEFAULT_NAMESPACE: &str = "default";
const MESSAGE: &str = "Avoid using the default namespace";

/// Flags workloads and their configuration in the `default` namespace.
///
/// Objects Kubernetes creates there on its own are exempt: the `kubernetes`
/// service, the `default` service account with its token secrets, and the
/// `kube-root-ca.crt` config map.
pub struct DefaultNamespace;

impl DefaultNamespace {
    fn in_default(meta: &ObjectMeta) -> bool {
        meta.namespace.as_deref() == Some(DEFAULT_NAMESPACE)
    }

    fn is_default_token(secret: &Secret) -> bool {
        let name = util::name(&secret.metadata);
        let owned_by_default = secret
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get("kubernetes.io/service-account.name"))
            .is_some_and(|sa| sa == DEFAULT_NAMESPACE);
        secret.type_.as_deref() == Some("kubernetes.io/service-account-token")
            && (owned_by_default || name.starts_with("default-token-"))
    }

    fn diagnose<'a, I>(&self, kind: Kind, metas: I, diagnostics: &mut Vec<Diagnostic>)
    where
        I: Iterator<Item = &'a ObjectMeta>,
    {
        diagnostics.extend(
            metas
                .filter(|m| Self::in_default(m))
                .map(|m| Diagnostic::new(self.name(), Severity::Warning, kind, m, MESSAGE)),
        );
    }
}

impl Check for DefaultNamespace {
    fn name(&self) -> &str {
        "default-namespace"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC]
    }

    fn description(&self) -> &str {
        "Checks for user objects created in the default namespace"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let mut diagnostics = Vec::new();

        self.diagnose(Kind::Pod, objects.pods.iter().map(|o| &o.metadata), &mut diagnostics);
        self.diagnose(
            Kind::PodTemplate,
            objects.pod_templates.iter().map(|o| &o.metadata),
            &mut diagnostics,
        );
        self.diagnose(
            Kind::PersistentVolumeClaim,
            objects.persistent_volume_claims.iter().map(|o| &o.metadata),
            &mut diagnostics,
        );
        self.diagnose(
            Kind::ConfigMap,
            objects
                .config_maps
                .iter()
                .map(|o| &o.metadata)
                .filter(|m| util::name(m) != "kube-root-ca.crt"),
            &mut diagnostics,
        );
        self.diagnose(
            Kind::Service,
            objects
                .services
                .iter()
                .map(|o| &o.metadata)
                .filter(|m| util::name(m) != "kubernetes"),
            &mut diagnostics,
        );
        self.diagnose(
            Kind::Secret,
            objects
                .secrets
                .iter()
                .filter(|s| !Self::is_default_token(s))
                .map(|o| &o.metadata),
            &mut diagnostics,
        );
        self.diagnose(
            Kind::ServiceAccount,
            objects
                .service_accounts
                .iter()
                .map(|o| &o.metadata)
                .filter(|m| util::name(m) != DEFAULT_NAMESPACE),
            &mut diagnostics,
        );

        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::fixtures::{labels, meta, pod};
    use k8s_openapi::api::core::v1::{ConfigMap, Service, ServiceAccount};

    #[test]
    fn system_objects_are_exempt() {
        let mut token = Secret {
            metadata: meta("default-token-x7k2p", DEFAULT_NAMESPACE),
            type_: Some("kubernetes.io/service-account-token".to_string()),
            ..Default::default()
        };
        token.metadata.annotations =
            Some(labels(&[("kubernetes.io/service-account.name", "default")]));

        let objects = Objects {
            services: vec![Service {
                metadata: meta("kubernetes", DEFAULT_NAMESPACE),
                ..Default::default()
            }],
            service_accounts: vec![ServiceAccount {
                metadata: meta("default", DEFAULT_NAMESPACE),
                ..Default::default()
            }],
            config_maps: vec![ConfigMap {
                metadata: meta("kube-root-ca.crt", DEFAULT_NAMESPACE),
                ..Default::default()
            }],
            secrets: vec![token],
            ..Default::default()
        };
        assert!(DefaultNamespace.run(&objects).unwrap().is_empty());
    }

    #[test]
    fn user_objects_are_reported() {
        let objects = Objects {
            pods: vec![pod("web", DEFAULT_NAMESPACE, vec![]), pod("api", "prod", vec![])],
            config_maps: vec![ConfigMap {
                metadata: meta("settings", DEFAULT_NAMESPACE),
                ..Default::default()
            }],
            secrets: vec![Secret {
                metadata: meta("db-password", DEFAULT_NAMESPACE),
                type_: Some("Opaque".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let diagnostics = DefaultNamespace.run(&objects).unwrap();
        let kinds: Vec<_> = diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![Kind::Pod, Kind::ConfigMap, Kind::Secret]);
        assert!(diagnostics.iter().all(|d| d.message == MESSAGE));
    }
}
