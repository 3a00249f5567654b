//! Envelope handling through the client.

use super::harness::{MockProvider, MockTransport, TestClient};
use crate::{ApiError, ApiRequest, HttpResponse, Payload};
use qti_auth::AuthenticationMethod;
use serde_json::{json, Value};

fn serving(body: Value) -> MockTransport {
    MockTransport::new(move |_| Ok(HttpResponse::json(200, &body)))
}

#[tokio::test]
async fn success_envelope_yields_data() {
    let t = TestClient::new(
        serving(json!({"success": true, "data": {"x": 1}})),
        MockProvider::issuing("T2"),
    );

    let value: Value = t.client.execute_json(ApiRequest::get("/x")).await.unwrap();
    assert_eq!(value, json!({"x": 1}));
}

/// `success: false` is rejected with the backend message and not reported.
#[tokio::test]
async fn failure_envelope_is_rejected_with_message() {
    let t = TestClient::new(
        serving(json!({"success": false, "message": "bad"})),
        MockProvider::issuing("T2"),
    )
    .logged_in(AuthenticationMethod::Password);

    let err = t.client.execute(ApiRequest::get("/x")).await.unwrap_err();

    match err {
        ApiError::Envelope { message } => assert_eq!(message, "bad"),
        other => panic!("expected Envelope, got {other:?}"),
    }
    assert_eq!(t.errors.count(), 0);
    assert_eq!(t.client.failure_budget(), 0, "a 2xx still resets the budget");
    assert!(t.client.is_logged_in());
}

#[tokio::test]
async fn non_json_body_passes_through() {
    let t = TestClient::new(
        MockTransport::new(|_| Ok(HttpResponse::new(200, "code,score\nA1,2\n"))),
        MockProvider::issuing("T2"),
    );

    let response = t.client.execute(ApiRequest::get("/delivery/D1/csv")).await.unwrap();
    assert_eq!(response.payload, Payload::Raw(b"code,score\nA1,2\n".to_vec()));
}

/// Error statuses are not unwrapped; the raw body stays on the failure.
#[tokio::test]
async fn error_status_body_is_kept_raw() {
    let t = TestClient::new(
        MockTransport::new(|_| {
            Ok(HttpResponse::json(
                404,
                &json!({"success": false, "message": "not found"}),
            ))
        }),
        MockProvider::issuing("T2"),
    );

    let err = t.client.execute(ApiRequest::get("/assessment/nope")).await.unwrap_err();
    let failure = err.http_failure().unwrap();
    assert_eq!(failure.status, 404);
    assert!(failure.body.contains("not found"));
}
