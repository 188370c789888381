//! Error types for the kube crate.

use std::time::Duration;

use clusterlint_core::LintError;
use kube::config::{InferConfigError, KubeconfigError};
use thiserror::Error;

/// Errors that can occur while connecting to or reading from a cluster.
#[derive(Error, Debug)]
pub enum KubeError {
    /// Kubernetes API error.
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The kubeconfig file could not be read or lacks the requested context.
    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] KubeconfigError),

    /// Neither in-cluster nor default kubeconfig settings were usable.
    #[error("Failed to infer cluster configuration: {0}")]
    InferConfig(#[from] InferConfigError),

    /// The fetch did not complete in time.
    #[error("Timed out fetching cluster objects after {0:?}")]
    Timeout(Duration),
}

impl KubeError {
    /// Whether the error comes from local configuration rather than the
    /// cluster.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Kubeconfig(_) | Self::InferConfig(_))
    }

    /// HTTP status returned by the API server, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Kube(kube::Error::Api(response)) => Some(response.code),
            _ => None,
        }
    }
}

impl From<KubeError> for LintError {
    fn from(err: KubeError) -> Self {
        Self::Fetch(err.to_string())
    }
}

/// A specialized Result type for kube operations.
pub type Result<T> = std::result::Result<T, KubeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16) -> KubeError {
        KubeError::Kube(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code,
        }))
    }

    #[test]
    fn status_code_from_api_errors() {
        assert_eq!(api_error(403).status_code(), Some(403));
        assert_eq!(KubeError::Timeout(Duration::from_secs(1)).status_code(), None);
    }

    #[test]
    fn converts_to_fetch_error() {
        let err: LintError = KubeError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(&err, LintError::Fetch(msg) if msg.contains("5s")));
        assert!(!err.is_config_error());

        let err: LintError = api_error(403).into();
        assert!(matches!(err, LintError::Fetch(msg) if msg.contains("forbidden")));
    }

    #[test]
    fn config_errors() {
        assert!(!api_error(500).is_config_error());
        assert!(!KubeError::Timeout(Duration::from_secs(1)).is_config_error());
    }
}
