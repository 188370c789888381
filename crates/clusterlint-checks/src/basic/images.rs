//! Container image reference checks.

use clusterlint_core::{Check, CheckError, Diagnostic, Kind, Objects, Severity};

use crate::group;
use crate::util::{self, ImageRef};

/// Visit every container image in the snapshot's pods.
fn for_each_image<F>(objects: &Objects, mut visit: F)
where
    F: FnMut(&k8s_openapi::api::core::v1::Pod, &str, ImageRef<'_>),
{
    for pod in &objects.pods {
        for container in util::pod_containers(pod) {
            if let Some(image) = container.image.as_deref() {
                visit(pod, &container.name, ImageRef::parse(image));
            }
        }
    }
}

/// Flags images that rely on the default registry.
pub struct FullyQualifiedImage;

impl Check for FullyQualifiedImage {
    fn name(&self) -> &str {
        "fully-qualified-image"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC]
    }

    fn description(&self) -> &str {
        "Checks for container images without a registry domain"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let mut diagnostics = Vec::new();
        for_each_image(objects, |pod, container, image| {
            if !image.is_fully_qualified() {
                diagnostics.push(Diagnostic::new(
                    self.name(),
                    Severity::Suggestion,
                    Kind::Pod,
                    &pod.metadata,
                    format!("Use fully qualified image for container '{container}'"),
                ));
            }
        });
        Ok(diagnostics)
    }
}

/// Flags images that float on the `latest` tag.
pub struct LatestTag;

impl Check for LatestTag {
    fn name(&self) -> &str {
        "latest-tag"
    }

    fn groups(&self) -> &[&str] {
        &[group::BASIC]
    }

    fn description(&self) -> &str {
        "Checks for container images using the latest tag"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let mut diagnostics = Vec::new();
        for_each_image(objects, |pod, container, image| {
            if image.is_latest() {
                diagnostics.push(Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Kind::Pod,
                    &pod.metadata,
                    format!("Avoid latest tag for container '{container}'"),
                ));
            }
        });
        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::fixtures::{container, pod};
    use k8s_openapi::api::core::v1::Container;

    fn objects(images: &[&str]) -> Objects {
        let containers = images
            .iter()
            .enumerate()
            .map(|(i, image)| container(&format!("c{i}"), image))
            .collect();
        Objects {
            pods: vec![pod("web", "prod", containers)],
            ..Default::default()
        }
    }

    #[test]
    fn fully_qualified_image() {
        let objects = objects(&[
            "nginx:1.25",
            "docker.io/library/nginx:1.25",
            "ghcr.io/org/app@sha256:abc",
            "docker.io/nginx",
        ]);
        let diagnostics = FullyQualifiedImage.run(&objects).unwrap();
        let flagged: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            flagged,
            vec![
                "Use fully qualified image for container 'c0'",
                "Use fully qualified image for container 'c3'",
            ]
        );
        assert!(diagnostics.iter().all(|d| d.severity == Severity::Suggestion));
    }

    #[test]
    fn latest_tag() {
        let objects = objects(&[
            "nginx",
            "nginx:latest",
            "nginx:1.25",
            "registry.k8s.io/pause@sha256:abc",
        ]);
        let diagnostics = LatestTag.run(&objects).unwrap();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].message.contains("'c0'"));
        assert!(diagnostics[1].message.contains("'c1'"));
    }

    #[test]
    fn init_containers_are_checked() {
        let mut objects = objects(&["docker.io/library/nginx:1.25"]);
        objects.pods[0].spec.as_mut().unwrap().init_containers = Some(vec![Container {
            name: "migrate".to_string(),
            image: Some("migrate:latest".to_string()),
            ..Default::default()
        }]);

        let diagnostics = LatestTag.run(&objects).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'migrate'"));
    }

    #[test]
    fn containers_without_image_are_ignored() {
        let mut objects = objects(&[]);
        objects.pods[0].spec.as_mut().unwrap().containers = vec![Container {
            name: "broken".to_string(),
            ..Default::default()
        }];
        assert!(LatestTag.run(&objects).unwrap().is_empty());
        assert!(FullyQualifiedImage.run(&objects).unwrap().is_empty());
    }
}
