//! Helpers shared by the built-in checks.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

/// Init containers followed by regular containers of a pod spec.
pub fn containers(spec: &PodSpec) -> impl Iterator<Item = &Container> {
    spec.init_containers
        .iter()
        .flatten()
        .chain(spec.containers.iter())
}

/// All containers of a pod; empty when the pod has no spec.
pub fn pod_containers(pod: &Pod) -> impl Iterator<Item = &Container> {
    pod.spec.iter().flat_map(containers)
}

/// Object name, or the empty string.
#[must_use]
pub fn name(meta: &ObjectMeta) -> &str {
    meta.name.as_deref().unwrap_or_default()
}

/// Object namespace, or the empty string for cluster-scoped objects.
#[must_use]
pub fn namespace(meta: &ObjectMeta) -> &str {
    meta.namespace.as_deref().unwrap_or_default()
}

/// `(namespace, name)` key used by cross-referencing checks.
#[must_use]
pub fn key(namespace: &str, name: &str) -> (String, String) {
    (namespace.to_string(), name.to_string())
}

/// Components of a container image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef<'a> {
    /// Registry host, e.g. `docker.io` or `localhost:5000`.
    pub domain: Option<&'a str>,
    /// Repository path below the registry.
    pub path: &'a str,
    /// Tag, if any.
    pub tag: Option<&'a str>,
    /// Digest, if any.
    pub digest: Option<&'a str>,
}

impl<'a> ImageRef<'a> {
    /// Split an image string into its components.
    #[must_use]
    pub fn parse(image: &'a str) -> Self {
        let (rest, digest) = match image.split_once('@') {
            Some((rest, digest)) => (rest, Some(digest)),
            None => (image, None),
        };

        let last_slash = rest.rfind('/');
        let (rest, tag) = match rest.rfind(':') {
            Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
                (&rest[..colon], Some(&rest[colon + 1..]))
            }
            _ => (rest, None),
        };

        let (domain, path) = match rest.split_once('/') {
            Some((first, path))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (Some(first), path)
            }
            _ => (None, rest),
        };

        Self {
            domain,
            path,
            tag,
            digest,
        }
    }

    /// Whether the reference names its registry explicitly and is already
    /// in canonical form (Docker Hub images need the `library/` prefix).
    #[must_use]
    pub fn is_fully_qualified(&self) -> bool {
        match self.domain {
            None | Some("index.docker.io") => false,
            Some("docker.io") => self.path.contains('/') && is_lowercase(self.path),
            Some(_) => is_lowercase(self.path),
        }
    }

    /// Whether the reference resolves to the mutable `latest` tag.
    #[must_use]
    pub fn is_latest(&self) -> bool {
        match self.tag {
            Some(tag) => tag == "latest",
            None => self.digest.is_none(),
        }
    }
}

fn is_lowercase(path: &str) -> bool {
    !path.is_empty() && !path.chars().any(char::is_uppercase)
}

/// Whether a label selector matches a label set. An empty selector matches
/// everything.
#[must_use]
pub fn selector_matches(selector: &LabelSelector, labels: &BTreeMap<String, String>) -> bool {
    let labels_match = selector
        .match_labels
        .iter()
        .flatten()
        .all(|(k, v)| labels.get(k) == Some(v));
    if !labels_match {
        return false;
    }

    selector.match_expressions.iter().flatten().all(|expr| {
        let values = expr.values.as_deref().unwrap_or_default();
        let actual = labels.get(&expr.key);
        match expr.operator.as_str() {
            "In" => actual.is_some_and(|v| values.contains(v)),
            "NotIn" => actual.is_none_or(|v| !values.contains(v)),
            "Exists" => actual.is_some(),
            "DoesNotExist" => actual.is_none(),
            _ => false,
        }
    })
}

/// Whether an equality-based selector (as used by services) matches. An
/// empty selector matches nothing, as Kubernetes treats it as "no selector".
#[must_use]
pub fn map_selector_matches(
    selector: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> bool {
    !selector.is_empty() && selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}
