//! Authenticated client: the request pipeline shared by every API variant.
//!
//! Each call runs decorate → transport → classify. A first-attempt 401/403
//! with a refresh token on hand takes the client's refresh gate, renews the
//! credentials once and replays the request once. An authorization refusal
//! during the refresh or on the replay resets the session.

use crate::coordinator::{plan_for, run_refresh, Reauthenticator, RefreshFailure};
use crate::envelope;
use crate::error::{ApiError, ApiResult, ExhaustedStage, HttpFailure, IneligibleReason};
use crate::failure::{classify, Verdict};
use crate::headers::{decorate, HeaderContext};
use crate::refresh_gate::{GateState, RefreshGate};
use crate::request::{ApiRequest, ApiResponse, HttpResponse, PendingRequest};
use crate::transport::{ReqwestTransport, Transport, TransportError};
use qti_auth::{AuthProvider, AuthenticationMethod, CredentialStore, Credentials, SignIn};
use qti_storage::{CredentialKey, KeyValueStore};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Invoked once with the final error of every failed request.
pub type ErrorCallback = Arc<dyn Fn(&ApiError) + Send + Sync>;

const DEFAULT_APP_ID: &str = "default";

/// Builder for [`AuthenticatedClient`].
pub struct ClientBuilder {
    base_url: Url,
    namespace: String,
    app_id: Option<String>,
    provider: Arc<dyn AuthProvider>,
    storage: Arc<dyn KeyValueStore>,
    transport: Option<Arc<dyn Transport>>,
    timeout: Option<Duration>,
    header_context: HeaderContext,
    reauthenticator: Option<Arc<dyn Reauthenticator>>,
    on_error: Option<ErrorCallback>,
    refresh_on_auth_failure: bool,
}

impl ClientBuilder {
    pub fn new(
        base_url: Url,
        namespace: impl Into<String>,
        provider: Arc<dyn AuthProvider>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            base_url,
            namespace: namespace.into(),
            app_id: None,
            provider,
            storage,
            transport: None,
            timeout: None,
            header_context: HeaderContext::default(),
            reauthenticator: None,
            on_error: None,
            refresh_on_auth_failure: true,
        }
    }

    /// Application id, part of the storage key.
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Use a caller-supplied transport instead of the default reqwest one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Default timeout of the reqwest transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header_context(mut self, context: HeaderContext) -> Self {
        self.header_context = context;
        self
    }

    pub fn reauthenticator(mut self, reauthenticator: Arc<dyn Reauthenticator>) -> Self {
        self.reauthenticator = Some(reauthenticator);
        self
    }

    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    /// When off, 401/403 responses fail like any other status.
    pub fn refresh_on_auth_failure(mut self, enabled: bool) -> Self {
        self.refresh_on_auth_failure = enabled;
        self
    }

    /// Load stored credentials and assemble the client.
    pub fn build(self) -> ApiResult<AuthenticatedClient> {
        let app_id = self
            .app_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| DEFAULT_APP_ID.to_string());
        let key = CredentialKey::for_backend(
            &self.namespace,
            &app_id,
            &self.base_url,
            self.provider.provider_id(),
        );
        let credentials = CredentialStore::open(self.storage, &key)?;
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new(self.timeout)));

        debug!(
            key = %key,
            logged_in = credentials.is_logged_in(),
            "Authenticated client ready"
        );

        Ok(AuthenticatedClient {
            inner: Arc::new(ClientInner {
                base_url: self.base_url,
                transport,
                provider: self.provider,
                credentials,
                gate: RefreshGate::new(),
                header_context: self.header_context,
                reauthenticator: self.reauthenticator,
                on_error: self.on_error,
                refresh_on_auth_failure: self.refresh_on_auth_failure,
            }),
        })
    }
}

struct ClientInner {
    base_url: Url,
    transport: Arc<dyn Transport>,
    provider: Arc<dyn AuthProvider>,
    credentials: CredentialStore,
    gate: RefreshGate,
    header_context: HeaderContext,
    reauthenticator: Option<Arc<dyn Reauthenticator>>,
    on_error: Option<ErrorCallback>,
    refresh_on_auth_failure: bool,
}

/// Cloneable handle over one client's shared state.
#[derive(Clone)]
pub struct AuthenticatedClient {
    inner: Arc<ClientInner>,
}

impl AuthenticatedClient {
    pub fn builder(
        base_url: Url,
        namespace: impl Into<String>,
        provider: Arc<dyn AuthProvider>,
        storage: Arc<dyn KeyValueStore>,
    ) -> ClientBuilder {
        ClientBuilder::new(base_url, namespace, provider, storage)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    pub fn provider(&self) -> &dyn AuthProvider {
        self.inner.provider.as_ref()
    }

    pub(crate) fn reauthenticator(&self) -> Option<&Arc<dyn Reauthenticator>> {
        self.inner.reauthenticator.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.credentials.is_logged_in()
    }

    pub fn gate_state(&self) -> GateState {
        self.inner.gate.state()
    }

    /// Authorization failures since the last success: 0 or 1.
    pub fn failure_budget(&self) -> u8 {
        self.inner.gate.failure_budget()
    }

    /// Sign in with the provider and hold the resulting credentials.
    pub async fn sign_in(
        &self,
        sign_in: &SignIn,
        method: AuthenticationMethod,
    ) -> ApiResult<Credentials> {
        let tokens = self.inner.provider.authenticate(sign_in).await?;
        let credentials = Credentials::from_tokens(tokens, method);
        self.install_credentials(credentials.clone())?;
        info!(
            provider = self.inner.provider.provider_id(),
            method = credentials.method.name(),
            "Signed in"
        );
        Ok(credentials)
    }

    /// Hold `credentials` and give the client a fresh failure budget.
    pub fn install_credentials(&self, credentials: Credentials) -> ApiResult<()> {
        self.inner.credentials.replace(credentials)?;
        self.inner.gate.reset();
        Ok(())
    }

    /// Drop all credentials and return to a logged-out state.
    ///
    /// Idempotent and safe to call concurrently.
    pub fn session_reset(&self) {
        if let Err(e) = self.inner.credentials.clear() {
            warn!(error = %e, "Credentials could not be removed from storage");
        }
        self.inner.gate.reset();
        info!(key = self.inner.credentials.key(), "Session reset");
    }

    /// Run a request through the full pipeline.
    pub async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let pending = request.into_pending(&self.inner.base_url)?;
        let response = self.dispatch(pending).await?;
        unwrap_envelope(response)
    }

    /// Run a request and decode the unwrapped payload.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        self.execute(request).await?.json()
    }

    /// Run a request whose payload is not needed.
    pub async fn execute_unit(&self, request: ApiRequest) -> ApiResult<()> {
        self.execute(request).await.map(|_| ())
    }

    /// Send a request exactly once: decorated, envelope-unwrapped, but never
    /// refreshed, never replayed and never reported to the error callback.
    pub async fn send_once(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let pending = request.into_pending(&self.inner.base_url)?;
        let response = self
            .transmit(&pending)
            .await
            .map_err(|source| ApiError::Transport {
                request_id: pending.id,
                source,
            })?;
        if !response.is_success() {
            return Err(ApiError::Status(HttpFailure::new(&pending, &response)));
        }
        unwrap_envelope(response)
    }

    async fn dispatch(&self, pending: PendingRequest) -> ApiResult<HttpResponse> {
        let response = self.attempt(&pending).await?;
        let verdict = classify(
            response.status,
            pending.retried,
            self.inner.credentials.refresh_token().is_some(),
        );

        match verdict {
            Verdict::Success => {
                self.inner.gate.record_success();
                Ok(response)
            }
            Verdict::Failed | Verdict::FailedAfterRetry => {
                Err(self.fail(ApiError::Status(HttpFailure::new(&pending, &response))))
            }
            _ if !self.inner.refresh_on_auth_failure => {
                Err(self.fail(ApiError::Status(HttpFailure::new(&pending, &response))))
            }
            Verdict::Ineligible(reason) => Err(self.fail(ApiError::AuthIneligible {
                failure: HttpFailure::new(&pending, &response),
                reason,
            })),
            Verdict::RefreshCandidate => {
                let failure = HttpFailure::new(&pending, &response);
                self.refresh_and_replay(pending, failure).await
            }
        }
    }

    async fn refresh_and_replay(
        &self,
        mut pending: PendingRequest,
        failure: HttpFailure,
    ) -> ApiResult<HttpResponse> {
        let Some(method) = self.inner.credentials.method() else {
            return Err(self.fail(ApiError::AuthIneligible {
                failure,
                reason: IneligibleReason::NoRefreshToken,
            }));
        };

        let plan = match plan_for(&method, self.inner.reauthenticator.is_some()) {
            Ok(plan) => plan,
            Err(reason) => return Err(self.fail(ApiError::AuthIneligible { failure, reason })),
        };

        let ticket = match self.inner.gate.try_acquire() {
            Ok(ticket) => ticket,
            Err(reason) => return Err(self.fail(ApiError::AuthIneligible { failure, reason })),
        };

        info!(
            request_id = %pending.id,
            status = failure.status,
            method = method.name(),
            "Authorization failed, refreshing credentials"
        );

        if let Err(RefreshFailure { stage, error }) = run_refresh(self, &plan).await {
            if error.is_authorization_failure() {
                warn!(request_id = %pending.id, %stage, error = %error, "Credentials refused during refresh");
                self.session_reset();
                drop(ticket);
                return Err(self.fail(ApiError::AuthExhausted { failure, stage }));
            }
            warn!(
                request_id = %pending.id,
                %stage,
                transient = error.is_transient(),
                error = %error,
                "Credential refresh failed, keeping session"
            );
            ticket.settle();
            return Err(self.fail(ApiError::RefreshFailed {
                failure,
                cause: Box::new(error),
            }));
        }
        ticket.settle();

        pending.retried = true;
        let response = self.attempt(&pending).await?;
        let verdict = classify(
            response.status,
            pending.retried,
            self.inner.credentials.refresh_token().is_some(),
        );

        match verdict {
            Verdict::Success => {
                self.inner.gate.record_success();
                debug!(request_id = %pending.id, "Replay succeeded");
                Ok(response)
            }
            Verdict::FailedAfterRetry => {
                let failure = HttpFailure::new(&pending, &response);
                warn!(request_id = %pending.id, status = failure.status, "Replay refused, resetting session");
                self.session_reset();
                Err(self.fail(ApiError::AuthExhausted {
                    failure,
                    stage: ExhaustedStage::Replay,
                }))
            }
            _ => Err(self.fail(ApiError::Status(HttpFailure::new(&pending, &response)))),
        }
    }

    /// One transport round trip, reporting transport errors.
    async fn attempt(&self, pending: &PendingRequest) -> ApiResult<HttpResponse> {
        self.transmit(pending).await.map_err(|source| {
            self.fail(ApiError::Transport {
                request_id: pending.id,
                source,
            })
        })
    }

    async fn transmit(&self, pending: &PendingRequest) -> Result<HttpResponse, TransportError> {
        let credentials = self.inner.credentials.current();
        let headers = decorate(&pending.headers, credentials.as_ref(), &self.inner.header_context);
        debug!(
            request_id = %pending.id,
            method = %pending.method,
            url = %pending.url,
            retried = pending.retried,
            "Sending request"
        );
        self.inner.transport.send(pending, headers).await
    }

    /// Log a final error and hand it to the error callback.
    fn fail(&self, error: ApiError) -> ApiError {
        match error.http_failure() {
            Some(failure) => warn!(
                request_id = %failure.request_id,
                status = failure.status,
                kind = ?error.kind(),
                body_summary = %failure.body_summary(),
                "Request failed"
            ),
            None => warn!(kind = ?error.kind(), error = %error, "Request failed"),
        }
        if error.is_reported() {
            if let Some(callback) = &self.inner.on_error {
                callback(&error);
            }
        }
        error
    }
}

fn unwrap_envelope(response: HttpResponse) -> ApiResult<ApiResponse> {
    let payload = envelope::unwrap(&response.body).map_err(|message| {
        debug!(status = response.status, "Response envelope reported failure");
        ApiError::Envelope { message }
    })?;
    Ok(ApiResponse {
        status: response.status,
        headers: response.headers,
        payload,
    })
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("credentials", &self.inner.credentials)
            .field("gate", &self.inner.gate.state())
            .finish()
    }
}
