//! Credential model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the held credentials were obtained.
///
/// The variant decides how an expired access token is renewed. Tags this
/// build does not know deserialize to `Unrecognized`, which is never
/// eligible for renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthenticationMethod {
    /// E-mail and password sign-in (teacher and tools clients).
    Password,
    /// Anonymous student identity.
    Anonymous,
    /// Student bound to a session code.
    Code { code: String },
    /// Student started an assessment directly.
    Assessment {
        assessment_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identification: Option<String>,
    },
    /// Student joined through a delivery code.
    Delivery {
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identification: Option<String>,
    },
    /// Student joined a test set through its session code.
    Testset {
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identification: Option<String>,
    },
    #[serde(other)]
    Unrecognized,
}

impl AuthenticationMethod {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            AuthenticationMethod::Password => "password",
            AuthenticationMethod::Anonymous => "anonymous",
            AuthenticationMethod::Code { .. } => "code",
            AuthenticationMethod::Assessment { .. } => "assessment",
            AuthenticationMethod::Delivery { .. } => "delivery",
            AuthenticationMethod::Testset { .. } => "testset",
            AuthenticationMethod::Unrecognized => "unrecognized",
        }
    }
}

/// Student-side identifiers sent along with every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub is_demo: bool,
}

/// Credentials held by one client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub method: AuthenticationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub context: SessionContext,
}

impl Credentials {
    /// Credentials freshly issued by a provider.
    pub fn from_tokens(tokens: AuthTokens, method: AuthenticationMethod) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.filter(|t| !t.is_empty()),
            method,
            subject_id: tokens.subject_id,
            context: SessionContext::default(),
        }
    }

    /// Refresh token, if one is held and non-empty.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("method", &self.method)
            .field("subject_id", &self.subject_id)
            .field("context", &self.context)
            .finish()
    }
}

/// Tokens returned by a provider sign-in or refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access_token: String,
    /// Present when the provider issued or rotated a refresh token.
    pub refresh_token: Option<String>,
    pub subject_id: Option<String>,
}

impl AuthTokens {
    /// Tokens with only an access token.
    pub fn access_only(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            subject_id: None,
        }
    }
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("subject_id", &self.subject_id)
            .finish()
    }
}

/// Sign-in request handed to a provider.
#[derive(Clone)]
pub enum SignIn {
    Anonymous,
    Password { email: String, password: String },
}

impl fmt::Debug for SignIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignIn::Anonymous => f.write_str("Anonymous"),
            SignIn::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Account details returned by a provider lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}
