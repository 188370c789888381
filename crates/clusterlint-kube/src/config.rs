//! Connection settings for the Kubernetes API.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How to reach the cluster.
///
/// With neither `kubeconfig` nor `context` set, the standard inference chain
/// applies: `KUBECONFIG` / `~/.kube/config`, then in-cluster service account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubeConfig {
    /// Path to a kubeconfig file.
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the current one.
    pub context: Option<String>,
    /// Upper bound for fetching the whole snapshot.
    pub timeout: Option<Duration>,
}

impl KubeConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `CLUSTERLINT_KUBECONFIG`: path to a kubeconfig file
    /// - `CLUSTERLINT_CONTEXT`: kubeconfig context
    /// - `CLUSTERLINT_TIMEOUT_SECS`: fetch timeout in seconds
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CLUSTERLINT_KUBECONFIG") {
            config.kubeconfig = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("CLUSTERLINT_CONTEXT") {
            config.context = Some(val);
        }
        if let Ok(val) = std::env::var("CLUSTERLINT_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.timeout = Some(Duration::from_secs(secs));
            }
        }

        config
    }

    /// Use the given kubeconfig file.
    #[must_use]
    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Use the given kubeconfig context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Bound the fetch by the given timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_infers_everything() {
        let config = KubeConfig::default();
        assert!(config.kubeconfig.is_none());
        assert!(config.context.is_none());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn builders() {
        let config = KubeConfig::default()
            .with_kubeconfig("/etc/clusterlint/kubeconfig")
            .with_context("staging")
            .with_timeout(Duration::from_secs(30));
        assert_eq!(
            config.kubeconfig.as_deref(),
            Some(std::path::Path::new("/etc/clusterlint/kubeconfig"))
        );
        assert_eq!(config.context.as_deref(), Some("staging"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }
}
