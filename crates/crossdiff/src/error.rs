//! Error types for cross-account comparison.
//!
//! Errors are categorized so the orchestrator can tell run-aborting failures
//! (credentials, account validation, nothing to compare) from failures that
//! are scoped to a single service, resource type or resource.

use thiserror::Error;

/// Categories of comparison errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Credentials missing, invalid or role assumption refused
    Authentication,
    /// The caller is not allowed to read a service
    Permission,
    /// A service API or export failed
    Service,
    /// Invalid input (account id, service name, pattern)
    Validation,
    /// Diffing or identity resolution failed
    Comparison,
    /// Local configuration or snapshot problem
    Configuration,
    /// A worker panicked or an invariant broke
    Internal,
}

impl ErrorCategory {
    /// Whether errors of this category abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication | Self::Validation)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication failed",
            Self::Permission => "Permission denied",
            Self::Service => "Service request failed",
            Self::Validation => "Invalid input",
            Self::Comparison => "Comparison failed",
            Self::Configuration => "Configuration problem",
            Self::Internal => "Unexpected error",
        }
    }
}

/// Errors that can occur while fetching or comparing two accounts.
#[derive(Debug, Error)]
pub enum Error {
    /// No credentials could be found for an account
    #[error("no credentials found for profile '{profile}'")]
    CredentialsNotFound {
        /// Profile that was looked up
        profile: String,
    },

    /// Credentials exist but were rejected
    #[error("invalid credentials: {reason}")]
    InvalidCredentials {
        /// Rejection reason reported by the provider
        reason: String,
    },

    /// Role assumption failed
    #[error("failed to assume role {role_arn}: {reason}")]
    AssumeRole {
        /// Role that could not be assumed
        role_arn: String,
        /// Failure reason
        reason: String,
    },

    /// Account id is not a 12-digit number
    #[error("invalid account id '{0}': expected exactly 12 digits")]
    InvalidAccountId(String),

    /// A service name is not registered
    #[error("service '{0}' is not supported")]
    ServiceNotSupported(String),

    /// None of the requested services is registered
    #[error("no valid services to compare (requested: {})", requested.join(", "))]
    NoValidServices {
        /// Names the caller asked for
        requested: Vec<String>,
    },

    /// Fetching resources of a service failed
    #[error("failed to fetch {service}: {reason}")]
    Fetch {
        /// Service being fetched
        service: String,
        /// Failure reason
        reason: String,
    },

    /// Read access denied for a service operation
    #[error("permission denied for {service}:{operation}")]
    PermissionDenied {
        /// Service being called
        service: String,
        /// Operation that was denied
        operation: String,
    },

    /// Structural diff went deeper than the recursion limit
    #[error("value nesting exceeds depth limit at '{path}'")]
    DepthExceeded {
        /// Path at which the limit was hit
        path: String,
    },

    /// An exclusion pattern failed to compile
    #[error("invalid exclusion pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A worker panicked
    #[error("{context} panicked: {message}")]
    Panicked {
        /// What was running
        context: String,
        /// Panic payload, when it was a string
        message: String,
    },

    /// Local configuration problem
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::CredentialsNotFound { .. }
            | Error::InvalidCredentials { .. }
            | Error::AssumeRole { .. } => ErrorCategory::Authentication,
            Error::PermissionDenied { .. } => ErrorCategory::Permission,
            Error::Fetch { .. } => ErrorCategory::Service,
            Error::InvalidAccountId(_)
            | Error::ServiceNotSupported(_)
            | Error::NoValidServices { .. }
            | Error::InvalidPattern(_) => ErrorCategory::Validation,
            Error::DepthExceeded { .. } => ErrorCategory::Comparison,
            Error::Config(_) | Error::Io(_) | Error::Json(_) => ErrorCategory::Configuration,
            Error::Panicked { .. } | Error::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this error aborts the run instead of being recorded.
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }

    /// Stable variant name, used as `error_type` in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::CredentialsNotFound { .. } => "CredentialsNotFound",
            Error::InvalidCredentials { .. } => "InvalidCredentials",
            Error::AssumeRole { .. } => "AssumeRoleError",
            Error::InvalidAccountId(_) => "InvalidAccountId",
            Error::ServiceNotSupported(_) => "ServiceNotSupported",
            Error::NoValidServices { .. } => "NoValidServices",
            Error::Fetch { .. } => "FetchError",
            Error::PermissionDenied { .. } => "PermissionDenied",
            Error::DepthExceeded { .. } => "DepthExceeded",
            Error::InvalidPattern(_) => "InvalidPattern",
            Error::Panicked { .. } => "Panicked",
            Error::Config(_) => "ConfigError",
            Error::Io(_) => "IoError",
            Error::Json(_) => "JsonError",
            Error::Other(_) => "Error",
        }
    }

    /// Provider error code, when one applies.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Error::PermissionDenied { .. } => Some("AccessDenied"),
            Error::AssumeRole { .. } => Some("AssumeRoleFailed"),
            _ => None,
        }
    }

    /// Actionable advice for resolving this error.
    pub fn suggestion(&self) -> String {
        match self {
            Error::CredentialsNotFound { profile } => format!(
                "Export a snapshot for profile '{profile}' into the snapshot root or point the account at a snapshot directory"
            ),
            Error::InvalidCredentials { .. } => {
                "Refresh the credentials or re-run the login for this profile".to_string()
            }
            Error::AssumeRole { role_arn, .. } => format!(
                "Check that the trust policy of {role_arn} allows the caller and that the external id matches"
            ),
            Error::InvalidAccountId(_) => {
                "Account ids are 12-digit numbers, e.g. 123456789012".to_string()
            }
            Error::ServiceNotSupported(_) | Error::NoValidServices { .. } => {
                "Run 'acctdiff list-services' to see supported services".to_string()
            }
            Error::PermissionDenied { service, operation } => format!(
                "Grant read access to {service}:{operation} or exclude '{service}' from the run"
            ),
            Error::InvalidPattern(_) => {
                "Exclusion patterns are regular expressions; check escaping".to_string()
            }
            _ => self.category().description().to_string(),
        }
    }

    /// Build a panic error from a `catch_unwind` payload.
    pub fn from_panic(context: impl Into<String>, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Error::Panicked {
            context: context.into(),
            message,
        }
    }
}

/// Result type for comparison operations.
pub type Result<T> = std::result::Result<T, Error>;
