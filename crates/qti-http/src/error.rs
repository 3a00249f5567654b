//! API error types.

use crate::request::{HttpResponse, PendingRequest};
use crate::transport::TransportError;
use qti_auth::{summarize_response_body, AuthError};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// A non-success HTTP response, tied to the request that produced it.
#[derive(Debug, Clone)]
pub struct HttpFailure {
    pub request_id: Uuid,
    pub method: String,
    pub url: String,
    pub status: u16,
    /// Response body as text, for callers that want the backend's message.
    pub body: String,
}

impl HttpFailure {
    pub fn new(request: &PendingRequest, response: &HttpResponse) -> Self {
        Self {
            request_id: request.id,
            method: request.method.to_string(),
            url: request.url.to_string(),
            status: response.status,
            body: response.text_lossy(),
        }
    }

    /// Returns true for 401 and 403.
    pub fn is_authorization_failure(&self) -> bool {
        is_authorization_status(self.status)
    }

    pub fn body_summary(&self) -> String {
        summarize_response_body(&self.body)
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} returned HTTP {}", self.method, self.url, self.status)
    }
}

pub(crate) fn is_authorization_status(status: u16) -> bool {
    status == 401 || status == 403
}

/// Where an unrecoverable authorization failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustedStage {
    /// The provider refused the refresh token.
    Refresh,
    /// The backend refused the session-binding request after a refresh.
    Reauthentication,
    /// The replayed request was refused again.
    Replay,
}

impl fmt::Display for ExhaustedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExhaustedStage::Refresh => "refresh",
            ExhaustedStage::Reauthentication => "re-authentication",
            ExhaustedStage::Replay => "replay",
        })
    }
}

/// Why an authorization failure was not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    NoRefreshToken,
    /// Another request of this client is refreshing right now.
    RefreshInFlight,
    /// A refresh already ran and no request has succeeded since.
    BudgetSpent,
    /// The stored method lacks the identifier it renews with.
    MissingPrerequisite(&'static str),
    UnrecognizedMethod,
    /// The method needs a re-authentication step this client cannot perform.
    NoReauthenticator,
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IneligibleReason::NoRefreshToken => f.write_str("no refresh token"),
            IneligibleReason::RefreshInFlight => f.write_str("refresh already in flight"),
            IneligibleReason::BudgetSpent => f.write_str("refresh budget spent"),
            IneligibleReason::MissingPrerequisite(what) => write!(f, "missing {}", what),
            IneligibleReason::UnrecognizedMethod => f.write_str("unrecognized authentication method"),
            IneligibleReason::NoReauthenticator => f.write_str("no re-authenticator installed"),
        }
    }
}

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthExhausted,
    AuthIneligible,
    RefreshFailed,
    Transport,
    Envelope,
    Other,
}

/// Error returned by every client call.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Credentials could not be renewed; the session was reset.
    #[error("authorization failed at {stage}, session reset: {failure}")]
    AuthExhausted {
        failure: HttpFailure,
        stage: ExhaustedStage,
    },

    /// Authorization failure that was not retried.
    #[error("authorization failed, not retried ({reason}): {failure}")]
    AuthIneligible {
        failure: HttpFailure,
        reason: IneligibleReason,
    },

    /// The refresh step failed for a reason other than an authorization refusal.
    #[error("credential refresh failed ({cause}) after: {failure}")]
    RefreshFailed {
        failure: HttpFailure,
        #[source]
        cause: Box<ApiError>,
    },

    #[error("{0}")]
    Status(HttpFailure),

    #[error("transport error on request {request_id}: {source}")]
    Transport {
        request_id: Uuid,
        #[source]
        source: TransportError,
    },

    /// `success: false` response envelope.
    #[error("{message}")]
    Envelope { message: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::AuthExhausted { .. } => ErrorKind::AuthExhausted,
            ApiError::AuthIneligible { .. } => ErrorKind::AuthIneligible,
            ApiError::RefreshFailed { .. } => ErrorKind::RefreshFailed,
            ApiError::Status(_) | ApiError::Transport { .. } => ErrorKind::Transport,
            ApiError::Envelope { .. } => ErrorKind::Envelope,
            ApiError::Decode(_)
            | ApiError::Auth(_)
            | ApiError::InvalidUrl(_)
            | ApiError::InvalidRequest(_) => ErrorKind::Other,
        }
    }

    /// The HTTP failure behind this error, if any.
    pub fn http_failure(&self) -> Option<&HttpFailure> {
        match self {
            ApiError::AuthExhausted { failure, .. }
            | ApiError::AuthIneligible { failure, .. }
            | ApiError::RefreshFailed { failure, .. }
            | ApiError::Status(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth(e) => e.status(),
            other => other.http_failure().map(|f| f.status),
        }
    }

    /// Returns true when the failure is an outright 401/403 refusal.
    pub fn is_authorization_failure(&self) -> bool {
        match self {
            ApiError::Auth(e) => e.is_authorization_failure(),
            ApiError::Status(failure) => failure.is_authorization_failure(),
            _ => false,
        }
    }

    /// Returns true when repeating the call later may succeed: timeouts,
    /// connection failures and 5xx answers, including those behind a failed
    /// refresh.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Auth(e) => e.is_transient(),
            ApiError::Transport { source, .. } => !matches!(source, TransportError::Build(_)),
            ApiError::Status(failure) => failure.status >= 500,
            ApiError::RefreshFailed { cause, .. } => cause.is_transient(),
            _ => false,
        }
    }

    /// Whether the client-level error callback hears about this error.
    pub fn is_reported(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::AuthExhausted
                | ErrorKind::AuthIneligible
                | ErrorKind::RefreshFailed
                | ErrorKind::Transport
        )
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
