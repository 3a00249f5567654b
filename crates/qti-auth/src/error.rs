//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Invalid email or password
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The identity provider answered with a non-success status
    #[error("Identity provider rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider does not implement this operation
    #[error("Operation not supported by provider: {0}")]
    Unsupported(&'static str),

    /// No credentials are held
    #[error("Not logged in")]
    NotLoggedIn,

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] qti_storage::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Network unavailable (transient error, can retry)
    #[error("Network unavailable")]
    NetworkUnavailable,
}

impl AuthError {
    /// HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Rejected { status, .. } => Some(*status),
            AuthError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if the provider refused the credentials outright (401/403).
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Network unavailable
    /// - HTTP errors with 5xx status codes
    /// - Connection timeouts
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::NetworkUnavailable => true,
            AuthError::Timeout => true,
            AuthError::Rejected { status, .. } => *status >= 500,
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(status: u16) -> AuthError {
        AuthError::Rejected {
            status,
            message: "TOKEN_EXPIRED".to_string(),
        }
    }

    #[test]
    fn test_authorization_failure_statuses() {
        assert!(rejected(401).is_authorization_failure());
        assert!(rejected(403).is_authorization_failure());
        assert!(!rejected(400).is_authorization_failure());
        assert!(!rejected(500).is_authorization_failure());
    }

    #[test]
    fn test_status_only_for_http_shaped_errors() {
        assert_eq!(rejected(403).status(), Some(403));
        assert_eq!(AuthError::Timeout.status(), None);
        assert_eq!(AuthError::Unsupported("sign_up").status(), None);
    }

    #[test]
    fn test_is_transient_network_unavailable() {
        assert!(AuthError::NetworkUnavailable.is_transient());
    }

    #[test]
    fn test_is_transient_timeout() {
        assert!(AuthError::Timeout.is_transient());
    }

    #[test]
    fn test_is_transient_server_rejection() {
        assert!(rejected(503).is_transient());
        assert!(!rejected(401).is_transient());
    }

    #[test]
    fn test_is_not_transient_invalid_credentials() {
        assert!(!AuthError::InvalidCredentials("bad password".to_string()).is_transient());
    }

    #[test]
    fn test_is_not_transient_not_logged_in() {
        assert!(!AuthError::NotLoggedIn.is_transient());
    }
}
