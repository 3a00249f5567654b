//! Credential refresh strategies.

use crate::client::AuthenticatedClient;
use crate::error::{ApiError, ExhaustedStage, IneligibleReason};
use async_trait::async_trait;
use qti_auth::{AuthError, AuthenticationMethod};
use tracing::{info, warn};

/// How a client renews its credentials after an authorization failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshPlan {
    /// Exchange the refresh token with the provider.
    TokenExchange,
    /// Exchange the refresh token, then re-bind the student session.
    TokenExchangeThenReauthenticate(AuthenticationMethod),
}

/// Choose the refresh plan for a stored authentication method.
pub fn plan_for(
    method: &AuthenticationMethod,
    can_reauthenticate: bool,
) -> Result<RefreshPlan, IneligibleReason> {
    let needs_reauth = match method {
        AuthenticationMethod::Password | AuthenticationMethod::Anonymous => false,
        AuthenticationMethod::Code { code } => {
            require(code, "session code")?;
            true
        }
        AuthenticationMethod::Assessment { assessment_id, .. } => {
            require(assessment_id, "assessment id")?;
            true
        }
        AuthenticationMethod::Delivery { code, .. } => {
            require(code, "delivery code")?;
            true
        }
        AuthenticationMethod::Testset { code, .. } => {
            require(code, "testset code")?;
            true
        }
        AuthenticationMethod::Unrecognized => return Err(IneligibleReason::UnrecognizedMethod),
    };

    if !needs_reauth {
        return Ok(RefreshPlan::TokenExchange);
    }
    if !can_reauthenticate {
        return Err(IneligibleReason::NoReauthenticator);
    }
    Ok(RefreshPlan::TokenExchangeThenReauthenticate(method.clone()))
}

fn require(value: &str, what: &'static str) -> Result<(), IneligibleReason> {
    if value.trim().is_empty() {
        Err(IneligibleReason::MissingPrerequisite(what))
    } else {
        Ok(())
    }
}

/// Re-binds a student session after the token exchange.
///
/// Implementations send their request through
/// [`AuthenticatedClient::send_once`], which never enters the refresh path.
#[async_trait]
pub trait Reauthenticator: Send + Sync {
    async fn reauthenticate(
        &self,
        client: &AuthenticatedClient,
        method: &AuthenticationMethod,
    ) -> Result<(), ApiError>;
}

/// A refresh that did not complete.
#[derive(Debug)]
pub(crate) struct RefreshFailure {
    pub stage: ExhaustedStage,
    pub error: ApiError,
}

/// Run `plan` for `client`. The caller holds the refresh ticket.
pub(crate) async fn run_refresh(
    client: &AuthenticatedClient,
    plan: &RefreshPlan,
) -> Result<(), RefreshFailure> {
    let refresh_token = client
        .credentials()
        .refresh_token()
        .ok_or(RefreshFailure {
            stage: ExhaustedStage::Refresh,
            error: ApiError::Auth(AuthError::NotLoggedIn),
        })?;

    let provider = client.provider();
    let tokens = provider
        .refresh(&refresh_token)
        .await
        .map_err(|e| RefreshFailure {
            stage: ExhaustedStage::Refresh,
            error: ApiError::Auth(e),
        })?;

    match client.credentials().apply_refresh(&tokens) {
        Ok(true) => {}
        Ok(false) => {
            return Err(RefreshFailure {
                stage: ExhaustedStage::Refresh,
                error: ApiError::Auth(AuthError::NotLoggedIn),
            })
        }
        Err(e) => {
            warn!(error = %e, "Refreshed credentials could not be persisted");
        }
    }
    info!(provider = provider.provider_id(), "Access token refreshed");

    if let RefreshPlan::TokenExchangeThenReauthenticate(method) = plan {
        let Some(reauthenticator) = client.reauthenticator() else {
            return Err(RefreshFailure {
                stage: ExhaustedStage::Reauthentication,
                error: ApiError::InvalidRequest("no re-authenticator installed".to_string()),
            });
        };
        reauthenticator
            .reauthenticate(client, method)
            .await
            .map_err(|error| RefreshFailure {
                stage: ExhaustedStage::Reauthentication,
                error,
            })?;
        info!(method = method.name(), "Session re-authenticated");
    }

    Ok(())
}
