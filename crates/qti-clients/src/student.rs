//! Student API client.
//!
//! Students sign in anonymously with the identity provider and then bind the
//! anonymous identity to a session code, an assessment, a delivery code or a
//! test set code.
//! The binding is remembered with the credentials; after a token refresh the
//! [`StudentReauthenticator`] repeats it so the backend keeps recognising the
//! session.

use crate::error::{ClientError, ClientResult};
use crate::models::{
    AssessmentInfo, ItemInfo, SessionState, StudentAppSessionInfo, TestContext, TestsetResult,
    TestsetSession,
};
use crate::options::ClientOptions;
use async_trait::async_trait;
use chrono::Local;
use qti_auth::{AuthProvider, AuthTokens, AuthenticationMethod, Credentials, SessionContext, SignIn};
use qti_http::{ApiError, ApiRequest, ApiResult, AuthenticatedClient, HeaderContext, Reauthenticator};
use qti_storage::StorageKeys;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Timestamp id `yyyyMMddHHmmssSSS` in local time.
pub fn date_id() -> String {
    Local::now().format("%Y%m%d%H%M%S%3f").to_string()
}

/// How a binding request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    /// Full pipeline, as for any other call.
    Pipeline,
    /// Single attempt, while a refresh is already in progress.
    Once,
}

async fn post_json<T: DeserializeOwned>(
    client: &AuthenticatedClient,
    request: ApiRequest,
    dispatch: Dispatch,
) -> ApiResult<T> {
    match dispatch {
        Dispatch::Pipeline => client.execute_json(request).await,
        Dispatch::Once => client.send_once(request).await?.json(),
    }
}

fn update_context(
    client: &AuthenticatedClient,
    f: impl FnOnce(&mut SessionContext),
) -> ApiResult<()> {
    client.credentials().update(|c| f(&mut c.context))?;
    Ok(())
}

/// `POST /checkCode`: bind to a session code.
async fn bind_code(
    client: &AuthenticatedClient,
    code: &str,
    dispatch: Dispatch,
) -> ClientResult<StudentAppSessionInfo> {
    let request = ApiRequest::post("/checkCode").json_value(json!({ "code": code }));
    let info: Option<StudentAppSessionInfo> = post_json(client, request, dispatch).await?;
    let info = info.ok_or_else(|| ClientError::UnknownCode(code.to_string()))?;

    let assessment = info.current_assessment();
    update_context(client, |context| {
        context.code = Some(code.to_string());
        context.assessment_id = assessment.map(|a| a.assessment_id);
        context.teacher_id = Some(info.teacher_id.clone()).filter(|t| !t.is_empty());
        context.is_demo = info.is_demo;
    })?;
    Ok(info)
}

/// `POST /session/start`: start or resume a session for an assessment.
async fn start_session(
    client: &AuthenticatedClient,
    assessment_id: &str,
    identification: Option<&str>,
    metadata: Option<&Value>,
    dispatch: Dispatch,
) -> ClientResult<StudentAppSessionInfo> {
    let request = ApiRequest::post("/session/start").json_value(json!({
        "metadata": metadata,
        "assessmentId": assessment_id,
        "identification": identification.unwrap_or_default(),
    }));
    let info: Option<StudentAppSessionInfo> = post_json(client, request, dispatch).await?;
    let Some(info) = info else {
        return Ok(StudentAppSessionInfo::default());
    };

    update_context(client, |context| {
        context.code = Some(info.code.clone()).filter(|c| !c.is_empty());
        context.is_demo = info.is_demo;
        if let Some(assessment) = &info.assessment {
            context.assessment_id = Some(assessment.assessment_id.clone());
        }
    })?;
    Ok(info)
}

/// `POST /assessment/checkCode`: resolve a delivery code to its assessment.
async fn check_delivery_code(
    client: &AuthenticatedClient,
    code: &str,
    identification: Option<&str>,
    dispatch: Dispatch,
) -> ClientResult<(StudentAppSessionInfo, AssessmentInfo)> {
    let request = ApiRequest::post("/assessment/checkCode").json_value(json!({
        "code": code,
        "identification": identification.unwrap_or_default(),
    }));
    let info: Option<StudentAppSessionInfo> = post_json(client, request, dispatch).await?;
    let info = info.ok_or_else(|| ClientError::UnknownCode(code.to_string()))?;

    let assessment = info.assessment.clone().unwrap_or_else(|| {
        let current = info
            .sessions
            .iter()
            .find(|s| Some(&s.assessment_id) == info.current_assessment_id.as_ref());
        AssessmentInfo {
            is_demo: info.is_demo,
            ..current.map(AssessmentInfo::from).unwrap_or_default()
        }
    });
    if assessment.assessment_id.is_empty() {
        return Err(ClientError::UnknownCode(code.to_string()));
    }

    update_context(client, |context| {
        context.assessment_id = Some(assessment.assessment_id.clone());
        context.is_demo = info.is_demo;
    })?;
    Ok((info, assessment))
}

/// `POST /testset/checkCode`: join a test set session by its code.
async fn check_testset_code(
    client: &AuthenticatedClient,
    code: &str,
    identification: Option<&str>,
    metadata: Option<&Value>,
    dispatch: Dispatch,
) -> ClientResult<TestsetSession> {
    let request = ApiRequest::post("/testset/checkCode").json_value(json!({
        "code": code,
        "identification": identification.unwrap_or_default(),
        "metadata": metadata,
    }));
    let session: Option<TestsetSession> = post_json(client, request, dispatch).await?;
    let session = session.ok_or_else(|| ClientError::UnknownCode(code.to_string()))?;

    let assessment_id = session.current_session().map(|s| s.assessment_id.clone());
    update_context(client, |context| {
        context.code = Some(session.code.clone()).filter(|c| !c.is_empty());
        if assessment_id.is_some() {
            context.assessment_id = assessment_id;
        }
        context.is_demo = session.is_demo;
    })?;
    Ok(session)
}

/// Re-binds student sessions after a token refresh.
#[derive(Debug, Default)]
pub struct StudentReauthenticator;

#[async_trait]
impl Reauthenticator for StudentReauthenticator {
    async fn reauthenticate(
        &self,
        client: &AuthenticatedClient,
        method: &AuthenticationMethod,
    ) -> Result<(), ApiError> {
        let result = match method {
            AuthenticationMethod::Code { code } => {
                bind_code(client, code, Dispatch::Once).await.map(|_| ())
            }
            AuthenticationMethod::Assessment {
                assessment_id,
                identification,
            } => start_session(
                client,
                assessment_id,
                identification.as_deref(),
                None,
                Dispatch::Once,
            )
            .await
            .map(|_| ()),
            AuthenticationMethod::Delivery {
                code,
                identification,
            } => check_delivery_code(client, code, identification.as_deref(), Dispatch::Once)
                .await
                .map(|_| ()),
            AuthenticationMethod::Testset {
                code,
                identification,
            } => check_testset_code(
                client,
                code,
                identification.as_deref(),
                None,
                Dispatch::Once,
            )
            .await
            .map(|_| ()),
            other => {
                debug!(method = other.name(), "Nothing to re-bind");
                Ok(())
            }
        };
        result.map_err(|e| match e {
            ClientError::Api(e) => e,
            other => ApiError::InvalidRequest(other.to_string()),
        })
    }
}

/// Client for the student delivery API.
#[derive(Debug, Clone)]
pub struct StudentClient {
    client: AuthenticatedClient,
    app_id: String,
}

impl StudentClient {
    pub fn new(options: &ClientOptions, provider: Arc<dyn AuthProvider>) -> ClientResult<Self> {
        let headers = HeaderContext {
            app_id: options.app_id.clone(),
            admin: false,
            xml_from_db: options.xml_from_db,
        };
        let client = options
            .builder(StorageKeys::STUDENT, provider, headers)
            .reauthenticator(Arc::new(StudentReauthenticator))
            .build()?;
        Ok(Self {
            client,
            app_id: options.app_id.clone().unwrap_or_default(),
        })
    }

    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    pub fn is_logged_in(&self) -> bool {
        self.client.is_logged_in()
    }

    /// Anonymous tokens: renewed from the held refresh token when there is
    /// one, otherwise a new anonymous account.
    async fn anonymous_tokens(&self) -> ClientResult<AuthTokens> {
        let provider = self.client.provider();
        let tokens = match self.client.credentials().refresh_token() {
            Some(refresh_token) => provider.refresh(&refresh_token).await?,
            None => provider.authenticate(&SignIn::Anonymous).await?,
        };
        Ok(tokens)
    }

    async fn sign_in_as(
        &self,
        method: AuthenticationMethod,
        context: SessionContext,
    ) -> ClientResult<Credentials> {
        let tokens = self.anonymous_tokens().await?;
        let held = self.client.credentials().current();
        let mut credentials = Credentials::from_tokens(tokens, method);
        if credentials.refresh_token.is_none() {
            credentials.refresh_token = held.as_ref().and_then(|c| c.refresh_token.clone());
        }
        if credentials.subject_id.is_none() {
            credentials.subject_id = held.and_then(|c| c.subject_id);
        }
        credentials.context = context;
        self.client.install_credentials(credentials.clone())?;
        info!(method = credentials.method.name(), "Student signed in");
        Ok(credentials)
    }

    pub async fn authenticate_anonymously(&self) -> ClientResult<StudentAppSessionInfo> {
        let credentials = self
            .sign_in_as(AuthenticationMethod::Anonymous, SessionContext::default())
            .await?;
        let code = credentials.subject_id.unwrap_or_default();
        update_context(&self.client, |context| {
            context.code = Some(code.clone()).filter(|c| !c.is_empty());
        })?;
        Ok(StudentAppSessionInfo {
            app_id: self.app_id.clone(),
            code,
            ..StudentAppSessionInfo::default()
        })
    }

    /// Sign in with a session code handed out by the teacher.
    pub async fn authenticate_by_code(&self, code: &str) -> ClientResult<StudentAppSessionInfo> {
        let context = SessionContext {
            code: Some(code.to_string()),
            ..SessionContext::default()
        };
        self.sign_in_as(
            AuthenticationMethod::Code {
                code: code.to_string(),
            },
            context,
        )
        .await?;
        bind_code(&self.client, code, Dispatch::Pipeline).await
    }

    /// Sign in and start a session for an assessment directly.
    pub async fn authenticate_by_assessment_id(
        &self,
        assessment_id: &str,
        identification: Option<&str>,
        metadata: Option<Value>,
    ) -> ClientResult<StudentAppSessionInfo> {
        let context = SessionContext {
            identification: identification.map(str::to_string),
            ..SessionContext::default()
        };
        self.sign_in_as(
            AuthenticationMethod::Assessment {
                assessment_id: assessment_id.to_string(),
                identification: identification.map(str::to_string),
            },
            context,
        )
        .await?;
        start_session(
            &self.client,
            assessment_id,
            identification,
            metadata.as_ref(),
            Dispatch::Pipeline,
        )
        .await
    }

    /// Sign in with a delivery code. Demo deliveries get a synthetic plan
    /// and no backend session.
    pub async fn authenticate_by_delivery_code(
        &self,
        code: &str,
        identification: Option<&str>,
        metadata: Option<Value>,
    ) -> ClientResult<StudentAppSessionInfo> {
        let context = SessionContext {
            identification: identification.map(str::to_string),
            ..SessionContext::default()
        };
        self.sign_in_as(
            AuthenticationMethod::Delivery {
                code: code.to_string(),
                identification: identification.map(str::to_string),
            },
            context,
        )
        .await?;

        let (info, assessment) =
            check_delivery_code(&self.client, code, identification, Dispatch::Pipeline).await?;

        if info.is_demo {
            return Ok(StudentAppSessionInfo {
                app_id: self.app_id.clone(),
                code: code.to_string(),
                is_demo: true,
                sessions: vec![crate::models::StudentSession {
                    assessment_id: assessment.assessment_id.clone(),
                    assessment_name: assessment.name.clone(),
                    package_id: assessment.package_id.clone(),
                    session_state: SessionState::NotStarted,
                }],
                assessment: Some(assessment),
                ..StudentAppSessionInfo::default()
            });
        }

        start_session(
            &self.client,
            &assessment.assessment_id,
            identification,
            metadata.as_ref(),
            Dispatch::Pipeline,
        )
        .await
    }

    /// Sign in with the code of a test set session.
    pub async fn authenticate_by_testset_code(
        &self,
        code: &str,
        identification: Option<&str>,
        metadata: Option<Value>,
    ) -> ClientResult<TestsetSession> {
        let context = SessionContext {
            code: Some(code.to_string()),
            identification: identification.map(str::to_string),
            ..SessionContext::default()
        };
        self.sign_in_as(
            AuthenticationMethod::Testset {
                code: code.to_string(),
                identification: identification.map(str::to_string),
            },
            context,
        )
        .await?;
        check_testset_code(
            &self.client,
            code,
            identification,
            metadata.as_ref(),
            Dispatch::Pipeline,
        )
        .await
    }

    pub fn logout(&self) {
        self.client.session_reset();
    }

    pub async fn get_assessment(&self, assessment_id: &str) -> ClientResult<AssessmentInfo> {
        Ok(self
            .client
            .execute_json(ApiRequest::get(format!("/assessment/{assessment_id}")))
            .await?)
    }

    pub async fn get_assessments(&self) -> ClientResult<Vec<AssessmentInfo>> {
        Ok(self.client.execute_json(ApiRequest::get("/assessments")).await?)
    }

    pub async fn get_assessment_by_code(&self, code: &str) -> ClientResult<AssessmentInfo> {
        let assessment: Option<AssessmentInfo> = self
            .client
            .execute_json(ApiRequest::get(format!("/assessment/code/{code}")))
            .await?;
        assessment.ok_or_else(|| ClientError::UnknownCode(code.to_string()))
    }

    pub async fn get_student_progress(&self) -> ClientResult<StudentAppSessionInfo> {
        Ok(self.client.execute_json(ApiRequest::get("/session/info")).await?)
    }

    /// Session info for a code, without changing the held binding.
    pub async fn get_student_session_info(
        &self,
        code: &str,
    ) -> ClientResult<StudentAppSessionInfo> {
        let request = ApiRequest::post("/checkCode").json_value(json!({ "code": code }));
        Ok(self.client.execute_json(request).await?)
    }

    pub async fn get_testset_session(&self, code: &str) -> ClientResult<TestsetSession> {
        let session: Option<TestsetSession> = self
            .client
            .execute_json(ApiRequest::get(format!("/testset-sessions/code/{code}")))
            .await?;
        session.ok_or_else(|| ClientError::UnknownCode(code.to_string()))
    }

    pub async fn get_testset_result(&self, testset_session_id: &str) -> ClientResult<TestsetResult> {
        Ok(self
            .client
            .execute_json(ApiRequest::get(format!(
                "/testset-sessions/{testset_session_id}/result"
            )))
            .await?)
    }

    pub async fn get_items_by_assessment_id(
        &self,
        assessment_id: &str,
    ) -> ClientResult<Vec<ItemInfo>> {
        Ok(self
            .client
            .execute_json(ApiRequest::get(format!("/assessment/{assessment_id}/items")))
            .await?)
    }

    pub async fn set_test_context(
        &self,
        assessment_id: &str,
        context: &TestContext,
    ) -> ClientResult<()> {
        let request = ApiRequest::post(format!("/session/{assessment_id}/context")).json(context)?;
        Ok(self.client.execute_unit(request).await?)
    }

    /// Saved progress, or `None` when there is none or it cannot be read.
    pub async fn get_test_context(&self, assessment_id: &str) -> Option<TestContext> {
        let result: ApiResult<Option<TestContext>> = self
            .client
            .execute_json(ApiRequest::get(format!("/session/{assessment_id}/context")))
            .await;
        match result {
            Ok(context) => context.filter(|c| c.items.is_some()),
            Err(e) => {
                debug!(assessment_id, error = %e, "No test context");
                None
            }
        }
    }

    pub async fn set_session_state(
        &self,
        assessment_id: &str,
        state: SessionState,
    ) -> ClientResult<()> {
        let request = ApiRequest::post(format!("/session/{assessment_id}/sessionState"))
            .json_value(json!({ "sessionState": state }));
        Ok(self.client.execute_unit(request).await?)
    }

    /// Record a student action against the current session.
    pub async fn log_action(
        &self,
        assessment_id: &str,
        action: &str,
        payload: Option<Value>,
    ) -> ClientResult<()> {
        let created_by = self
            .client
            .credentials()
            .current()
            .and_then(|c| c.subject_id)
            .unwrap_or_default();
        let request = ApiRequest::post(format!("/session/{assessment_id}/log")).json_value(json!({
            "type": action,
            "payload": payload,
            "time": date_id(),
            "createdBy": created_by,
        }));
        Ok(self.client.execute_unit(request).await?)
    }
}
