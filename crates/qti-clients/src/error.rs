use qti_auth::AuthError;
use qti_http::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The account signed in but may not use this application.
    #[error("account has no access to this application")]
    AccessDenied,

    /// The backend did not recognise a session or delivery code.
    #[error("unknown code: {0}")]
    UnknownCode(String),
}

impl From<AuthError> for ClientError {
    fn from(e: AuthError) -> Self {
        ClientError::Api(ApiError::Auth(e))
    }
}

impl ClientError {
    /// HTTP status behind the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api(e) => e.status(),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
