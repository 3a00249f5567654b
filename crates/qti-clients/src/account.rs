//! E-mail account sessions shared by the teacher and tools clients.

use crate::error::{ClientError, ClientResult};
use crate::options::ClientOptions;
use qti_auth::{AuthProvider, AuthTokens, AuthenticationMethod, Credentials, SignIn, UserInfo};
use qti_http::{ApiRequest, AuthenticatedClient, HeaderContext};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessCheck {
    #[serde(default)]
    has_access: bool,
}

/// Account lifecycle on top of an [`AuthenticatedClient`].
#[derive(Debug, Clone)]
pub struct AccountSession {
    client: AuthenticatedClient,
    check_access: bool,
}

impl AccountSession {
    pub(crate) fn open(
        options: &ClientOptions,
        namespace: &str,
        provider: Arc<dyn AuthProvider>,
    ) -> ClientResult<Self> {
        let headers = HeaderContext {
            app_id: None,
            admin: options.admin,
            xml_from_db: false,
        };
        let client = options.builder(namespace, provider, headers).build()?;
        Ok(Self {
            client,
            check_access: options.check_access,
        })
    }

    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    /// Sign in with e-mail and password.
    ///
    /// With access checking on, the new credentials are kept only when the
    /// backend confirms the account may use the application.
    pub async fn authenticate(&self, email: &str, password: &str) -> ClientResult<Credentials> {
        let sign_in = SignIn::Password {
            email: email.to_string(),
            password: password.to_string(),
        };
        let credentials = self
            .client
            .sign_in(&sign_in, AuthenticationMethod::Password)
            .await?;

        if self.check_access && !self.has_access().await? {
            warn!("Signed-in account has no access, discarding credentials");
            self.client.session_reset();
            return Err(ClientError::AccessDenied);
        }
        Ok(credentials)
    }

    async fn has_access(&self) -> ClientResult<bool> {
        let response = self.client.send_once(ApiRequest::post("/access")).await;
        match response {
            Ok(response) => Ok(response.json::<AccessCheck>()?.has_access),
            Err(e) => {
                self.client.session_reset();
                Err(e.into())
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> ClientResult<AuthTokens> {
        Ok(self.client.provider().sign_up(email, password).await?)
    }

    pub async fn password_reset(&self, email: &str) -> ClientResult<()> {
        Ok(self.client.provider().send_password_reset(email).await?)
    }

    /// Account behind the held access token.
    ///
    /// Lookup failures yield `None`; a 400 or 401 also ends the session.
    pub async fn logged_in_user(&self) -> Option<UserInfo> {
        let token = self.client.credentials().access_token()?;
        match self.client.provider().lookup_user(&token).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Account lookup failed");
                if matches!(e.status(), Some(400) | Some(401)) {
                    self.client.session_reset();
                }
                None
            }
        }
    }

    pub fn logout(&self) {
        self.client.session_reset();
        info!("Logged out");
    }

    pub fn access_token(&self) -> Option<String> {
        self.client.credentials().access_token()
    }

    pub fn is_logged_in(&self) -> bool {
        self.client.is_logged_in()
    }
}
