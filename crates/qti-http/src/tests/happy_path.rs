//! Recovered authorization failures.

use super::harness::{MockProvider, MockTransport, RefreshScript, TestClient};
use crate::{ApiRequest, GateState, RequestBody};
use qti_auth::AuthenticationMethod;
use serde_json::{json, Value};

/// 401 with T1, refresh yields T2, replay carries `Bearer T2` and succeeds.
#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let t = TestClient::new(MockTransport::accepting("T2"), MockProvider::issuing("T2"))
        .logged_in(AuthenticationMethod::Password);

    let value: Value = t
        .client
        .execute_json(ApiRequest::get("/assessments"))
        .await
        .unwrap();

    assert_eq!(value, json!({"ok": true}));
    assert_eq!(t.provider.refresh_calls(), 1);
    assert_eq!(
        t.transport.authorizations(),
        vec![Some("Bearer T1".to_string()), Some("Bearer T2".to_string())]
    );
    assert_eq!(t.errors.count(), 0, "recovered failures are not reported");
    assert_eq!(t.client.credentials().access_token().as_deref(), Some("T2"));
}

/// The replay resends the same method, path and body, marked as retried.
#[tokio::test]
async fn replay_is_identical_apart_from_token() {
    let t = TestClient::new(MockTransport::accepting("T2"), MockProvider::issuing("T2"))
        .logged_in(AuthenticationMethod::Password);

    t.client
        .execute(
            ApiRequest::post("/plan")
                .header("x-trace", "trace-1")
                .json_value(json!({"count": 3, "deliveryCodes": ["D1"]})),
        )
        .await
        .unwrap();

    let requests = t.transport.requests();
    assert_eq!(requests.len(), 2);
    let (first, replay) = (&requests[0], &requests[1]);
    assert_eq!(first.method, replay.method);
    assert_eq!(first.path, replay.path);
    assert_eq!(first.body, replay.body);
    assert_eq!(replay.body, RequestBody::Json(json!({"count": 3, "deliveryCodes": ["D1"]})));
    assert_eq!(replay.headers.get("x-trace").unwrap(), "trace-1");
    assert!(!first.retried);
    assert!(replay.retried);
}

/// A successful replay returns the budget to 0.
#[tokio::test]
async fn budget_returns_to_zero_after_successful_replay() {
    let t = TestClient::new(MockTransport::accepting("T2"), MockProvider::issuing("T2"))
        .logged_in(AuthenticationMethod::Anonymous);

    t.client.execute(ApiRequest::get("/sessions")).await.unwrap();

    assert_eq!(t.client.failure_budget(), 0);
    assert_eq!(t.client.gate_state(), GateState::Idle);
}

/// A rotated refresh token replaces the stored one; otherwise it is kept.
#[tokio::test]
async fn rotated_refresh_token_is_stored() {
    let t = TestClient::new(
        MockTransport::accepting("T2"),
        MockProvider::with_script(RefreshScript::Issue {
            access: "T2",
            refresh: Some("R2"),
        }),
    )
    .logged_in(AuthenticationMethod::Password);

    t.client.execute(ApiRequest::get("/sessions")).await.unwrap();
    assert_eq!(t.client.credentials().refresh_token().as_deref(), Some("R2"));

    let kept = TestClient::new(MockTransport::accepting("T2"), MockProvider::issuing("T2"))
        .logged_in(AuthenticationMethod::Password);
    kept.client.execute(ApiRequest::get("/sessions")).await.unwrap();
    assert_eq!(kept.client.credentials().refresh_token().as_deref(), Some("R1"));
}

/// After one recovered failure, a later expiry is recovered again.
#[tokio::test]
async fn later_expiry_gets_its_own_refresh() {
    let t = TestClient::new(MockTransport::accepting("T2"), MockProvider::issuing("T2"))
        .logged_in(AuthenticationMethod::Password);

    t.client.execute(ApiRequest::get("/sessions")).await.unwrap();

    // Token expires server-side again.
    t.client
        .credentials()
        .update(|c| c.access_token = "T-old".to_string())
        .unwrap();
    t.client.execute(ApiRequest::get("/sessions")).await.unwrap();

    assert_eq!(t.provider.refresh_calls(), 2);
    assert_eq!(t.errors.count(), 0);
}
