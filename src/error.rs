//! Error types for the Share Provisioner
//!
//! Provides structured error types for the safety guard, the remote
//! operation executor, post-completion reconciliation and the HTTP plumbing
//! underneath them.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the provisioner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Guard Errors (client-local, never sent over the wire)
    // =========================================================================
    #[error("{0}")]
    Validation(String),

    #[error("Confirmation mismatch. Type exactly: {expected}")]
    ConfirmationMismatch { expected: String },

    #[error("Operation cancelled by operator")]
    UserAbort,

    // =========================================================================
    // Remote Operation Errors
    // =========================================================================
    #[error("{0}")]
    Remote(String),

    #[error("Session expired. Please log in again.")]
    AuthExpired,

    // =========================================================================
    // Reconciliation Errors
    // =========================================================================
    #[error("{label} timed out after {}s", .timeout.as_secs_f64())]
    RefreshTimeout { label: String, timeout: Duration },

    #[error("{label} failed: {reason}")]
    RefreshFailed { label: String, reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Coarse classification used to decide how an error propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Blocked before any network activity
    Validation,
    /// Operator declined an interactive acknowledgment
    UserAbort,
    /// Backend rejected the operation or the transport failed
    Remote,
    /// Operator must re-authenticate
    AuthExpired,
    /// A post-completion refresh failed or timed out
    Reconciliation,
    /// Local misconfiguration or plumbing failure
    Internal,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::ConfirmationMismatch { .. } => ErrorKind::Validation,
            Error::UserAbort => ErrorKind::UserAbort,
            Error::Remote(_) => ErrorKind::Remote,
            Error::AuthExpired => ErrorKind::AuthExpired,
            Error::RefreshTimeout { .. } | Error::RefreshFailed { .. } => {
                ErrorKind::Reconciliation
            }
            Error::Configuration(_) | Error::Http(_) | Error::JsonParse(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Result type alias for the provisioner
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = Error::ConfirmationMismatch {
            expected: "WIPE /dev/sdb".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(Error::UserAbort.kind(), ErrorKind::UserAbort);
        assert_eq!(Error::Remote("Device not found".into()).kind(), ErrorKind::Remote);
        assert_eq!(Error::AuthExpired.kind(), ErrorKind::AuthExpired);
        assert_eq!(
            Error::Configuration("API base URL is empty".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_refresh_errors_are_soft() {
        let err = Error::RefreshTimeout {
            label: "USB device refresh".into(),
            timeout: Duration::from_millis(8000),
        };
        assert_eq!(err.kind(), ErrorKind::Reconciliation);
        assert_eq!(err.to_string(), "USB device refresh timed out after 8s");

        let err = Error::RefreshTimeout {
            label: "USB device refresh".into(),
            timeout: Duration::from_millis(8500),
        };
        assert_eq!(err.to_string(), "USB device refresh timed out after 8.5s");

        let err = Error::RefreshFailed {
            label: "NAS service refresh".into(),
            reason: "Request failed".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Reconciliation);
        assert_eq!(err.to_string(), "NAS service refresh failed: Request failed");
    }

    #[test]
    fn test_user_facing_messages() {
        let err = Error::ConfirmationMismatch {
            expected: "WIPE /dev/sdb".into(),
        };
        assert_eq!(
            err.to_string(),
            "Confirmation mismatch. Type exactly: WIPE /dev/sdb"
        );
        assert_eq!(
            Error::AuthExpired.to_string(),
            "Session expired. Please log in again."
        );
        assert_eq!(Error::Remote("Request failed".into()).to_string(), "Request failed");
    }
}
