//! Services whose selector matches nothing.

use std::collections::HashMap;

use clusterlint_core::{Check, CheckError, Diagnostic, Kind, Objects, Severity};
use k8s_openapi::api::core::v1::Pod;

use crate::group;
use crate::util;

/// Flags services that route to no pod.
pub struct DanglingService;

impl Check for DanglingService {
    fn name(&self) -> &str {
        "dangling-service"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC]
    }

    fn description(&self) -> &str {
        "Checks for services whose selector matches no pods"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let mut pods_by_namespace: HashMap<&str, Vec<&Pod>> = HashMap::new();
        for pod in &objects.pods {
            pods_by_namespace
                .entry(util::namespace(&pod.metadata))
                .or_default()
                .push(pod);
        }

        let mut diagnostics = Vec::new();
        for service in &objects.services {
            let Some(spec) = &service.spec else { continue };
            if spec.type_.as_deref() == Some("ExternalName") {
                continue;
            }
            // Services without a selector are backed by manual endpoints.
            let Some(selector) = spec.selector.as_ref().filter(|s| !s.is_empty()) else {
                continue;
            };

            let matched = pods_by_namespace
                .get(util::namespace(&service.metadata))
                .is_some_and(|pods| {
                    pods.iter().any(|pod| {
                        pod.metadata
                            .labels
                            .as_ref()
                            .is_some_and(|labels| util::map_selector_matches(selector, labels))
                    })
                });

            if !matched {
                diagnostics.push(Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Kind::Service,
                    &service.metadata,
                    "Service selector matches no pods",
                ));
            }
        }
        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::fixtures::{labels, meta, pod};
    use k8s_openapi::api::core::v1::{Service, ServiceSpec};

    fn service(name: &str, namespace: &str, selector: &[(&str, &str)]) -> Service {
        Service {
            metadata: meta(name, namespace),
            spec: Some(ServiceSpec {
                selector: Some(labels(selector)),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn selector_must_match_pod_in_same_namespace() {
        let mut web = pod("web-1", "prod", vec![]);
        web.metadata.labels = Some(labels(&[("app", "web"), ("tier", "frontend")]));

        let objects = Objects {
            pods: vec![web],
            services: vec![
                service("web", "prod", &[("app", "web")]),
                service("web", "staging", &[("app", "web")]),
                service("api", "prod", &[("app", "api")]),
                service("manual", "prod", &[]),
            ],
            ..Default::default()
        };

        let diagnostics = DanglingService.run(&objects).unwrap();
        let dangling: Vec<_> = diagnostics
            .iter()
            .map(|d| (d.object.namespace.as_deref().unwrap(), d.object.name.as_str()))
            .collect();
        assert_eq!(dangling, vec![("staging", "web"), ("prod", "api")]);
    }

    #[test]
    fn external_name_services_are_skipped() {
        let mut external = service("db", "prod", &[("app", "db")]);
        external.spec.as_mut().unwrap().type_ = Some("ExternalName".to_string());

        let objects = Objects {
            services: vec![external],
            ..Default::default()
        };
        assert!(DanglingService.run(&objects).unwrap().is_empty());
    }
}
