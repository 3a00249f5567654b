//! Identity provider capability.

use crate::{AuthError, AuthResult, AuthTokens, SignIn, UserInfo};
use async_trait::async_trait;

/// An identity provider that issues and renews access tokens.
///
/// `sign_up`, `send_password_reset` and `lookup_user` are optional; the
/// defaults report `AuthError::Unsupported`.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Stable identifier, part of the credential storage key.
    fn provider_id(&self) -> &str;

    /// Obtain fresh tokens for a sign-in request.
    async fn authenticate(&self, sign_in: &SignIn) -> AuthResult<AuthTokens>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> AuthResult<AuthTokens>;

    /// Create a new e-mail account.
    async fn sign_up(&self, _email: &str, _password: &str) -> AuthResult<AuthTokens> {
        Err(AuthError::Unsupported("sign_up"))
    }

    /// Send a password reset e-mail.
    async fn send_password_reset(&self, _email: &str) -> AuthResult<()> {
        Err(AuthError::Unsupported("send_password_reset"))
    }

    /// Look up the account an access token belongs to.
    async fn lookup_user(&self, _access_token: &str) -> AuthResult<Option<UserInfo>> {
        Err(AuthError::Unsupported("lookup_user"))
    }
}
