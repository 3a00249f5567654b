//! Irrecoverable authorization failures.

use super::harness::{MockProvider, MockTransport, RefreshScript, TestClient};
use crate::{ApiError, ApiRequest, ErrorKind, ExhaustedStage, GateState};
use qti_auth::AuthenticationMethod;

/// Refresh refused with 401: credentials cleared, caller gets the original
/// 401, callback fires once.
#[tokio::test]
async fn refused_refresh_resets_session() {
    let t = TestClient::new(
        MockTransport::always(401),
        MockProvider::with_script(RefreshScript::Reject(401)),
    )
    .logged_in(AuthenticationMethod::Password);
    assert!(t.stored().is_some());

    let err = t
        .client
        .execute(ApiRequest::get("/assessments"))
        .await
        .unwrap_err();

    match &err {
        ApiError::AuthExhausted { failure, stage } => {
            assert_eq!(failure.status, 401);
            assert!(failure.url.ends_with("/assessments"));
            assert_eq!(*stage, ExhaustedStage::Refresh);
        }
        other => panic!("expected AuthExhausted, got {other:?}"),
    }
    assert_eq!(t.transport.count(), 1, "no replay after a refused refresh");
    assert!(!t.client.is_logged_in());
    assert!(t.stored().is_none(), "storage cleared as well");
    assert_eq!(t.errors.kinds(), vec![ErrorKind::AuthExhausted]);
    assert_eq!(t.errors.statuses(), vec![Some(401)]);
    assert_eq!(t.client.gate_state(), GateState::Idle);
}

/// A 403 from the provider counts as a refusal too.
#[tokio::test]
async fn forbidden_refresh_resets_session() {
    let t = TestClient::new(
        MockTransport::always(403),
        MockProvider::with_script(RefreshScript::Reject(403)),
    )
    .logged_in(AuthenticationMethod::Anonymous);

    let err = t.client.execute(ApiRequest::get("/x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthExhausted);
    assert_eq!(err.status(), Some(403));
    assert!(!t.client.is_logged_in());
}

/// Replay refused again: session reset, caller gets the replay's failure.
#[tokio::test]
async fn refused_replay_resets_session() {
    let t = TestClient::new(MockTransport::always(401), MockProvider::issuing("T2"))
        .logged_in(AuthenticationMethod::Password);

    let err = t.client.execute(ApiRequest::get("/sessions")).await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::AuthExhausted {
            stage: ExhaustedStage::Replay,
            ..
        }
    ));
    assert_eq!(t.transport.count(), 2);
    assert_eq!(t.provider.refresh_calls(), 1);
    assert!(!t.client.is_logged_in());
    assert_eq!(t.errors.count(), 1);
}

/// A refresh failing for other reasons keeps the session and reports once.
#[tokio::test]
async fn unavailable_provider_is_refresh_failed_without_reset() {
    let t = TestClient::new(
        MockTransport::always(401),
        MockProvider::with_script(RefreshScript::Unavailable),
    )
    .logged_in(AuthenticationMethod::Password);

    let err = t.client.execute(ApiRequest::get("/sessions")).await.unwrap_err();

    match &err {
        ApiError::RefreshFailed { failure, cause } => {
            assert_eq!(failure.status, 401);
            assert!(matches!(**cause, ApiError::Auth(_)));
        }
        other => panic!("expected RefreshFailed, got {other:?}"),
    }
    assert!(err.is_transient());
    assert!(t.client.is_logged_in());
    assert_eq!(t.client.credentials().access_token().as_deref(), Some("T1"));
    assert_eq!(t.errors.kinds(), vec![ErrorKind::RefreshFailed]);
    assert_eq!(t.client.gate_state(), GateState::Spent);
}

/// A provider 5xx is not a refusal either.
#[tokio::test]
async fn provider_server_error_is_refresh_failed() {
    let t = TestClient::new(
        MockTransport::always(401),
        MockProvider::with_script(RefreshScript::Reject(503)),
    )
    .logged_in(AuthenticationMethod::Password);

    let err = t.client.execute(ApiRequest::get("/sessions")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RefreshFailed);
    assert!(err.is_transient(), "a provider outage is worth retrying later");
    assert!(t.client.is_logged_in());
}

/// Once spent, the budget stays spent until a request succeeds.
#[tokio::test]
async fn spent_budget_blocks_refresh_until_success() {
    let t = TestClient::new(
        MockTransport::new(|request| {
            if request.path == "/health" {
                Ok(crate::HttpResponse::new(200, "{}"))
            } else {
                Ok(crate::HttpResponse::new(401, ""))
            }
        }),
        MockProvider::with_script(RefreshScript::Unavailable),
    )
    .logged_in(AuthenticationMethod::Password);

    let _ = t.client.execute(ApiRequest::get("/sessions")).await;
    let err = t.client.execute(ApiRequest::get("/sessions")).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::AuthIneligible {
            reason: crate::IneligibleReason::BudgetSpent,
            ..
        }
    ));
    assert_eq!(t.provider.refresh_calls(), 1);

    t.client.execute(ApiRequest::get("/health")).await.unwrap();
    assert_eq!(t.client.failure_budget(), 0);

    let _ = t.client.execute(ApiRequest::get("/sessions")).await;
    assert_eq!(t.provider.refresh_calls(), 2);
}
