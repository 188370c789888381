//! Admission webhook configuration checks.
//!
//! Validating and mutating webhooks share every field these checks look at,
//! so both are viewed through [`Webhook`].

use std::collections::{BTreeMap, HashSet};

use clusterlint_core::{Check, CheckError, Diagnostic, Kind, Objects, Severity, SYSTEM_NAMESPACE};
use k8s_openapi::api::admissionregistration::v1::{RuleWithOperations, WebhookClientConfig};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use crate::group;
use crate::util;

/// Label the API server puts on every namespace.
const NAMESPACE_NAME_LABEL: &str = "kubernetes.io/metadata.name";

/// Requests to webhooks are cut off by the API server after 30 seconds.
const MAX_TIMEOUT_SECONDS: i32 = 29;

/// Borrowed view of one webhook inside a configuration.
struct Webhook<'a> {
    kind: Kind,
    config: &'a ObjectMeta,
    name: &'a str,
    client_config: &'a WebhookClientConfig,
    failure_policy: Option<&'a str>,
    timeout_seconds: Option<i32>,
    namespace_selector: Option<&'a LabelSelector>,
    object_selector: Option<&'a LabelSelector>,
    rules: &'a [RuleWithOperations],
}

impl Webhook<'_> {
    fn label(&self) -> &'static str {
        match self.kind {
            Kind::MutatingWebhookConfiguration => "Mutating",
            _ => "Validating",
        }
    }

    fn diagnostic(&self, check: &str, severity: Severity, message: String) -> Diagnostic {
        Diagnostic::new(check, severity, self.kind, self.config, message)
    }

    /// `failurePolicy` defaults to `Fail`.
    fn fails_closed(&self) -> bool {
        self.failure_policy.is_none_or(|p| p == "Fail")
    }

    fn applies_to_pods(&self) -> bool {
        self.rules.iter().any(|rule| {
            let core_group = rule
                .api_groups
                .iter()
                .flatten()
                .any(|g| g.is_empty() || g == "*");
            let pods = rule
                .resources
                .iter()
                .flatten()
                .any(|r| matches!(r.as_str(), "*" | "*/*" | "pods" | "pods/*"));
            core_group && pods
        })
    }

    fn matches_namespace(&self, labels: &BTreeMap<String, String>) -> bool {
        self.namespace_selector
            .is_none_or(|selector| util::selector_matches(selector, labels))
    }

    /// Whether the object selector lets unlabelled objects through.
    fn matches_unlabelled(&self) -> bool {
        self.object_selector
            .is_none_or(|selector| util::selector_matches(selector, &BTreeMap::new()))
    }
}

fn webhooks(objects: &Objects) -> impl Iterator<Item = Webhook<'_>> {
    let validating = objects
        .validating_webhook_configurations
        .iter()
        .flat_map(|config| {
            config.webhooks.iter().flatten().map(move |w| Webhook {
                kind: Kind::ValidatingWebhookConfiguration,
                config: &config.metadata,
                name: &w.name,
                client_config: &w.client_config,
                failure_policy: w.failure_policy.as_deref(),
                timeout_seconds: w.timeout_seconds,
                namespace_selector: w.namespace_selector.as_ref(),
                object_selector: w.object_selector.as_ref(),
                rules: w.rules.as_deref().unwrap_or_default(),
            })
        });
    let mutating = objects
        .mutating_webhook_configurations
        .iter()
        .flat_map(|config| {
            config.webhooks.iter().flatten().map(move |w| Webhook {
                kind: Kind::MutatingWebhookConfiguration,
                config: &config.metadata,
                name: &w.name,
                client_config: &w.client_config,
                failure_policy: w.failure_policy.as_deref(),
                timeout_seconds: w.timeout_seconds,
                namespace_selector: w.namespace_selector.as_ref(),
                object_selector: w.object_selector.as_ref(),
                rules: w.rules.as_deref().unwrap_or_default(),
            })
        });
    validating.chain(mutating)
}

/// Flags webhooks whose backing service does not exist.
///
/// A service in a namespace excluded by the run's namespace filter is never
/// reported missing, since it was not fetched.
pub struct WebhookTarget;

impl Check for WebhookTarget {
    fn name(&self) -> &str {
        "admission-controller-webhook"
    }

    fn groups(&self) -> &[&str] {
        &[group::ADMISSION]
    }

    fn description(&self) -> &str {
        "Checks that admission webhooks point at an existing service"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let namespaces: HashSet<&str> = objects
            .namespaces
            .iter()
            .map(|ns| util::name(&ns.metadata))
            .collect();
        let services: HashSet<(String, String)> = objects
            .services
            .iter()
            .map(|s| util::key(util::namespace(&s.metadata), util::name(&s.metadata)))
            .collect();

        let mut diagnostics = Vec::new();
        for webhook in webhooks(objects) {
            // URL-backed webhooks live outside the cluster.
            let Some(service) = &webhook.client_config.service else {
                continue;
            };
            let message = if !namespaces.contains(service.namespace.as_str()) {
                format!(
                    "{} webhook '{}' is configured against a service in a namespace that does not exist",
                    webhook.label(),
                    webhook.name
                )
            } else if objects
                .namespace_filter
                .matches(Some(service.namespace.as_str()))
                && !services.contains(&util::key(&service.namespace, &service.name))
            {
                format!(
                    "{} webhook '{}' is configured against a service that does not exist",
                    webhook.label(),
                    webhook.name
                )
            } else {
                continue;
            };
            diagnostics.push(webhook.diagnostic(self.name(), Severity::Error, message));
        }
        Ok(diagnostics)
    }
}

/// Flags webhooks whose timeout exceeds the API server's deadline.
pub struct WebhookTimeout;

impl Check for WebhookTimeout {
    fn name(&self) -> &str {
        "admission-controller-webhook-timeout"
    }

    fn groups(&self) -> &[&str] {
        &[group::ADMISSION]
    }

    fn description(&self) -> &str {
        "Checks for admission webhooks with a timeout above 29 seconds"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let diagnostics = webhooks(objects)
            .filter_map(|webhook| {
                let timeout = webhook.timeout_seconds?;
                (timeout > MAX_TIMEOUT_SECONDS).then(|| {
                    webhook.diagnostic(
                        self.name(),
                        Severity::Warning,
                        format!(
                            "{} webhook '{}' timeout of {timeout}s exceeds {MAX_TIMEOUT_SECONDS}s",
                            webhook.label(),
                            webhook.name
                        ),
                    )
                })
            })
            .collect();
        Ok(diagnostics)
    }
}

/// Flags fail-closed pod webhooks that also intercept `kube-system`.
///
/// When nodes are replaced, system pods cannot be recreated while such a
/// webhook's backend is itself unavailable.
pub struct WebhookReplacement;

impl Check for WebhookReplacement {
    fn name(&self) -> &str {
        "admission-controller-webhook-replacement"
    }

    fn groups(&self) -> &[&str] {
        &[group::ADMISSION]
    }

    fn description(&self) -> &str {
        "Checks for fail-closed pod webhooks that apply to the kube-system namespace"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let system_labels = objects
            .system_namespace
            .as_ref()
            .and_then(|ns| ns.metadata.labels.clone())
            .unwrap_or_else(|| {
                BTreeMap::from([(
                    NAMESPACE_NAME_LABEL.to_string(),
                    SYSTEM_NAMESPACE.to_string(),
                )])
            });

        let diagnostics = webhooks(objects)
            .filter(|w| w.fails_closed())
            .filter(|w| w.applies_to_pods())
            .filter(|w| w.matches_namespace(&system_labels))
            .filter(|w| w.matches_unlabelled())
            .map(|w| {
                let message = format!(
                    "{} webhook '{}' blocks pods in {SYSTEM_NAMESPACE} when its backend is unavailable",
                    w.label(),
                    w.name
                );
                w.diagnostic(self.name(), Severity::Error, message)
            })
            .collect();
        Ok(diagnostics)
    }
}
