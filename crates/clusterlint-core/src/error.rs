//! Error types for clusterlint.
//!
//! [`LintError`] covers every run-level failure surfaced to the caller:
//! configuration mistakes, fetch failures and failing checks. [`CheckError`]
//! is what an individual check returns from [`crate::Check::run`].

use thiserror::Error;

/// A result type using `LintError`.
pub type Result<T> = std::result::Result<T, LintError>;

/// Errors that abort a lint run or reject a configuration.
#[derive(Debug, Error)]
pub enum LintError {
    /// A check was registered without a name.
    #[error("check name cannot be empty")]
    EmptyCheckName,

    /// A check with the same name is already registered.
    #[error("check already exists: {0}")]
    DuplicateCheck(String),

    /// No check with the given name is registered.
    #[error("check not found: {0}")]
    CheckNotFound(String),

    /// Both include and exclude groups were requested.
    #[error("cannot specify both include and exclude group conditions")]
    ConflictingGroupFilters,

    /// Both include and exclude checks were requested.
    #[error("cannot specify both include and exclude check conditions")]
    ConflictingCheckFilters,

    /// Both include and exclude namespaces were requested.
    #[error("cannot specify both include and exclude namespace conditions")]
    ConflictingNamespaceFilters,

    /// The effective check set is empty after filtering.
    #[error("no checks to run. Are you sure that you provided the right names for groups and checks?")]
    NoChecksToRun,

    /// Fetching cluster objects failed.
    #[error("failed to fetch cluster objects: {0}")]
    Fetch(String),

    /// A check returned an error or panicked.
    #[error("check {check} failed: {message}")]
    CheckFailed {
        /// Name of the failing check.
        check: String,
        /// Error or panic message.
        message: String,
    },

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LintError {
    /// Whether this error stems from invalid configuration rather than
    /// from the cluster or a check.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyCheckName
                | Self::DuplicateCheck(_)
                | Self::CheckNotFound(_)
                | Self::ConflictingGroupFilters
                | Self::ConflictingCheckFilters
                | Self::ConflictingNamespaceFilters
                | Self::NoChecksToRun
        )
    }

    /// Name of the check responsible for this error, if any.
    #[must_use]
    pub fn check_name(&self) -> Option<&str> {
        match self {
            Self::CheckFailed { check, .. } => Some(check),
            _ => None,
        }
    }
}

/// Error returned by a check's `run`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CheckError(pub String);

impl CheckError {
    /// Create a check error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
