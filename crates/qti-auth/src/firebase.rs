//! Firebase identity provider over the Identity Toolkit and Secure Token REST APIs.

use crate::{AuthError, AuthProvider, AuthResult, AuthTokens, SignIn, UserInfo};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

/// Length and digest of a response body, safe to log.
pub fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Base URLs of the two Firebase REST services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseEndpoints {
    pub identity_toolkit: String,
    pub secure_token: String,
}

impl Default for FirebaseEndpoints {
    fn default() -> Self {
        Self {
            identity_toolkit: IDENTITY_TOOLKIT_URL.to_string(),
            secure_token: SECURE_TOKEN_URL.to_string(),
        }
    }
}

/// Sign-in, sign-up and lookup responses share this shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    local_id: Option<String>,
}

/// Secure Token exchange response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserInfo>,
}

/// Firebase implementation of [`AuthProvider`].
#[derive(Clone)]
pub struct FirebaseAuthProvider {
    http_client: reqwest::Client,
    api_key: String,
    endpoints: FirebaseEndpoints,
}

impl FirebaseAuthProvider {
    /// Create a provider against the public Firebase endpoints.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoints(api_key, FirebaseEndpoints::default())
    }

    /// Create a provider against custom endpoints (emulators, tests).
    pub fn with_endpoints(api_key: impl Into<String>, endpoints: FirebaseEndpoints) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoints,
        }
    }

    fn identity_url(&self, operation: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            self.endpoints.identity_toolkit.trim_end_matches('/'),
            operation,
            self.api_key
        )
    }

    fn token_url(&self) -> String {
        format!(
            "{}/token?key={}",
            self.endpoints.secure_token.trim_end_matches('/'),
            self.api_key
        )
    }

    async fn post<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
        body: &Value,
    ) -> AuthResult<T> {
        debug!(provider = "firebase", operation, "Calling identity provider");

        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            warn!(
                provider = "firebase",
                operation,
                status = %status,
                body_summary = %body_summary,
                "Identity provider rejected request"
            );
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: firebase_error_code(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

/// The `error.message` field of a Firebase error document, e.g. `TOKEN_EXPIRED`.
fn firebase_error_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn classify_send_error(e: reqwest::Error) -> AuthError {
    if e.is_timeout() {
        AuthError::Timeout
    } else if e.is_connect() {
        AuthError::NetworkUnavailable
    } else {
        AuthError::Http(e)
    }
}

impl From<IdentityResponse> for AuthTokens {
    fn from(r: IdentityResponse) -> Self {
        AuthTokens {
            access_token: r.id_token,
            refresh_token: r.refresh_token,
            subject_id: r.local_id,
        }
    }
}

impl From<TokenResponse> for AuthTokens {
    fn from(r: TokenResponse) -> Self {
        AuthTokens {
            access_token: r.id_token,
            refresh_token: r.refresh_token,
            subject_id: r.user_id,
        }
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuthProvider {
    fn provider_id(&self) -> &str {
        "firebase"
    }

    async fn authenticate(&self, sign_in: &SignIn) -> AuthResult<AuthTokens> {
        let result = match sign_in {
            SignIn::Anonymous => {
                self.post::<IdentityResponse>(
                    "sign_in_anonymously",
                    &self.identity_url("signUp"),
                    &json!({ "returnSecureToken": true }),
                )
                .await
            }
            SignIn::Password { email, password } => {
                self.post::<IdentityResponse>(
                    "sign_in_with_password",
                    &self.identity_url("signInWithPassword"),
                    &json!({ "email": email, "password": password, "returnSecureToken": true }),
                )
                .await
            }
        };

        match result {
            Ok(response) => Ok(response.into()),
            Err(AuthError::Rejected { status: 400, message }) => {
                Err(AuthError::InvalidCredentials(message))
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<AuthTokens> {
        let response: TokenResponse = self
            .post(
                "refresh_token",
                &self.token_url(),
                &json!({ "grant_type": "refresh_token", "refresh_token": refresh_token }),
            )
            .await?;
        Ok(response.into())
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthTokens> {
        let response: IdentityResponse = self
            .post(
                "sign_up",
                &self.identity_url("signUp"),
                &json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(response.into())
    }

    async fn send_password_reset(&self, email: &str) -> AuthResult<()> {
        let _: Value = self
            .post(
                "send_password_reset",
                &self.identity_url("sendOobCode"),
                &json!({ "email": email, "requestType": "PASSWORD_RESET" }),
            )
            .await?;
        Ok(())
    }

    async fn lookup_user(&self, access_token: &str) -> AuthResult<Option<UserInfo>> {
        let response: LookupResponse = self
            .post(
                "lookup_user",
                &self.identity_url("lookup"),
                &json!({ "idToken": access_token }),
            )
            .await?;
        Ok(response.users.into_iter().next())
    }
}
