//! Teacher client scenarios.

use super::harness::{only_for, options, Backend, Provider};
use crate::models::{
    NewTestset, NewTestsetSession, SessionState, StatsTarget, TestsetState, TestsetUpdate,
};
use crate::{ClientError, TeacherClient};
use qti_http::HttpResponse;
use qti_storage::MemoryStore;
use serde_json::json;
use std::sync::Arc;

fn access_granted(backend: &Arc<Backend>) {
    backend.data("POST /access", json!({"hasAccess": true}));
}

async fn signed_in(backend: &Arc<Backend>) -> TeacherClient {
    access_granted(backend);
    let storage = Arc::new(MemoryStore::new());
    let teacher = TeacherClient::new(&options(backend, &storage), Provider::new()).unwrap();
    teacher.authenticate("t@example.com", "secret").await.unwrap();
    teacher
}

#[tokio::test]
async fn authenticate_checks_access_with_new_token() {
    let backend = Backend::new();
    let teacher = signed_in(&backend).await;

    assert!(teacher.is_logged_in());
    assert_eq!(teacher.access_token().as_deref(), Some("A1"));
    let access = backend.last("POST /access");
    assert_eq!(access.authorization.as_deref(), Some("Bearer A1"));
}

#[tokio::test]
async fn denied_access_discards_credentials() {
    let backend = Backend::new().data("POST /access", json!({"hasAccess": false}));
    let storage = Arc::new(MemoryStore::new());
    let teacher = TeacherClient::new(&options(&backend, &storage), Provider::new()).unwrap();

    let err = teacher.authenticate("t@example.com", "secret").await.unwrap_err();

    assert!(matches!(err, ClientError::AccessDenied));
    assert!(!teacher.is_logged_in());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn access_check_can_be_skipped() {
    let backend = Backend::new();
    let storage = Arc::new(MemoryStore::new());
    let teacher = TeacherClient::new(
        &options(&backend, &storage).check_access(false),
        Provider::new(),
    )
    .unwrap();

    teacher.authenticate("t@example.com", "secret").await.unwrap();

    assert!(backend.seen().is_empty());
    assert!(teacher.is_logged_in());
}

#[tokio::test]
async fn admin_header_is_sent() {
    let backend = Backend::new().data("GET /sessions", json!([]));
    access_granted(&backend);
    let storage = Arc::new(MemoryStore::new());
    let teacher =
        TeacherClient::new(&options(&backend, &storage).admin(true), Provider::new()).unwrap();
    teacher.authenticate("t@example.com", "secret").await.unwrap();

    teacher.get_sessions().await.unwrap();

    assert_eq!(backend.last("GET /sessions").header("x-admin"), Some("true"));
    assert_eq!(backend.last("GET /sessions").header("x-app"), None);
}

#[tokio::test]
async fn list_endpoints_unwrap_their_collections() {
    let backend = Backend::new()
        .data(
            "GET /assessments",
            json!({"assessments": [{"id": "A1", "name": "Math", "packageId": "P1"}]}),
        )
        .data("GET /packages", json!({}));
    let teacher = signed_in(&backend).await;

    let assessments = teacher.get_assessments().await.unwrap();
    assert_eq!(assessments.len(), 1);
    assert_eq!(assessments[0].name, "Math");
    assert!(teacher.get_packages().await.unwrap().is_empty());
}

#[tokio::test]
async fn request_bodies_match_backend_contract() {
    let delivery = json!({"id": "D1", "assessmentId": "A1", "state": "active"});
    let backend = Backend::new()
        .data("POST /delivery/create", delivery.clone())
        .data("POST /delivery/stop", delivery.clone())
        .data("POST /plan", json!([]))
        .data("POST /session/reset", json!(null))
        .data("POST /student/update", json!(null));
    let teacher = signed_in(&backend).await;

    let created = teacher.create_delivery("A1").await.unwrap();
    assert_eq!(created.id, "D1");
    teacher.stop_delivery("D1").await.unwrap();
    teacher
        .plan_students(Some(3), None)
        .await
        .unwrap();
    teacher.reset_session("S1").await.unwrap();
    teacher.add_student_identification("S1", "Ada").await.unwrap();

    assert_eq!(backend.last("POST /delivery/create").json(), json!({"assessmentId": "A1"}));
    assert_eq!(backend.last("POST /delivery/stop").json(), json!({"code": "D1"}));
    assert_eq!(
        backend.last("POST /plan").json(),
        json!({"count": 3, "deliveryCodes": null})
    );
    assert_eq!(backend.last("POST /session/reset").json(), json!({"code": "S1"}));
    assert_eq!(
        backend.last("POST /student/update").json(),
        json!({"code": "S1", "identification": "Ada"})
    );
}

#[tokio::test]
async fn csv_download_is_returned_verbatim() {
    let backend = Backend::new().on("GET /delivery/D1/csv", |_| {
        HttpResponse::new(200, "code;score\nS1;3\n")
    });
    let teacher = signed_in(&backend).await;

    let csv = teacher.download_results_by_delivery_code("D1").await.unwrap();
    assert_eq!(csv, b"code;score\nS1;3\n".to_vec());
}

#[tokio::test]
async fn score_delivery_returns_count() {
    let backend = Backend::new().data("POST /delivery/D1/score", json!({"scoredSessions": 12}));
    let teacher = signed_in(&backend).await;

    assert_eq!(teacher.score_delivery("D1").await.unwrap(), 12);
}

/// An expired token is refreshed and the call replayed transparently.
#[tokio::test]
async fn expired_token_is_refreshed() {
    let backend = Backend::new().on("GET /sessions", only_for("R1", json!([])));
    let teacher = signed_in(&backend).await;

    let sessions = teacher.get_sessions().await.unwrap();

    assert!(sessions.is_empty());
    assert_eq!(teacher.access_token().as_deref(), Some("R1"));
    assert_eq!(
        backend.routes_seen(),
        vec!["POST /access", "GET /sessions", "GET /sessions"]
    );
}

#[tokio::test]
async fn logged_in_user_uses_held_token() {
    let backend = Backend::new();
    let teacher = signed_in(&backend).await;

    let user = teacher.logged_in_user().await.unwrap();
    assert_eq!(user.local_id, "user-of-A1");
}

#[tokio::test]
async fn rejected_lookup_ends_session() {
    for (status, keeps_session) in [(400u16, false), (401, false), (500, true)] {
        let backend = Backend::new();
        access_granted(&backend);
        let storage = Arc::new(MemoryStore::new());
        let teacher =
            TeacherClient::new(&options(&backend, &storage), Provider::failing_lookup(status))
                .unwrap();
        teacher.authenticate("t@example.com", "secret").await.unwrap();

        assert!(teacher.logged_in_user().await.is_none());
        assert_eq!(teacher.is_logged_in(), keeps_session, "status {status}");
    }
}

#[tokio::test]
async fn logout_clears_storage() {
    let backend = Backend::new();
    access_granted(&backend);
    let storage = Arc::new(MemoryStore::new());
    let teacher = TeacherClient::new(&options(&backend, &storage), Provider::new()).unwrap();
    teacher.authenticate("t@example.com", "secret").await.unwrap();
    assert_eq!(storage.len(), 1);

    teacher.logout();

    assert!(storage.is_empty());
    assert_eq!(teacher.access_token(), None);
}

#[tokio::test]
async fn testset_management() {
    let testset = json!({
        "id": "TS1",
        "name": "Spring",
        "teacherId": "T1",
        "assessmentIds": ["A1", "A2"],
        "isActive": true
    });
    let backend = Backend::new()
        .data("POST /testsets", testset.clone())
        .data("PUT /testsets/TS1", testset.clone())
        .data("GET /testsets", json!([testset.clone()]))
        .data("GET /testsets/TS1", testset.clone())
        .data("DELETE /testsets/TS1", json!(null));
    let teacher = signed_in(&backend).await;

    let created = teacher
        .create_testset(&NewTestset {
            name: "Spring".to_string(),
            assessment_ids: vec!["A1".to_string(), "A2".to_string()],
            is_active: true,
            ..NewTestset::default()
        })
        .await
        .unwrap();
    assert_eq!(created.assessment_ids, vec!["A1", "A2"]);
    teacher
        .update_testset(
            "TS1",
            &TestsetUpdate {
                name: Some("Spring B".to_string()),
                ..TestsetUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(teacher.get_testsets().await.unwrap().len(), 1);
    assert_eq!(teacher.get_testset("TS1").await.unwrap().name, "Spring");
    teacher.delete_testset("TS1").await.unwrap();

    assert_eq!(
        backend.last("POST /testsets").json(),
        json!({"name": "Spring", "assessmentIds": ["A1", "A2"], "isActive": true})
    );
    assert_eq!(backend.last("PUT /testsets/TS1").json(), json!({"name": "Spring B"}));
    assert!(backend.routes_seen().contains(&"DELETE /testsets/TS1".to_string()));
}

#[tokio::test]
async fn testset_session_management() {
    let session = json!({"id": "TSS1", "code": "TS-42", "testsetId": "TS1", "state": "not_started"});
    let backend = Backend::new()
        .data("POST /testset-sessions", session.clone())
        .data("GET /testset-sessions/TSS1", session.clone())
        .data("GET /testsetsessions", json!([session.clone()]))
        .data("POST /testset-sessions/TSS1/reset", json!(null))
        .data("DELETE /testset-sessions/TSS1", json!(null));
    let teacher = signed_in(&backend).await;

    let created = teacher
        .create_testset_session(&NewTestsetSession {
            testset_id: "TS1".to_string(),
            student_id: "st-7".to_string(),
            identification: Some("Ada".to_string()),
            metadata: None,
        })
        .await
        .unwrap();
    assert_eq!(created.state, TestsetState::NotStarted);
    assert_eq!(teacher.get_testset_session("TSS1").await.unwrap().code, "TS-42");
    assert_eq!(teacher.get_testset_sessions().await.unwrap().len(), 1);
    teacher.reset_testset_session("TSS1").await.unwrap();
    teacher.delete_testset_session("TSS1").await.unwrap();

    assert_eq!(
        backend.last("POST /testset-sessions").json(),
        json!({"testsetId": "TS1", "studentId": "st-7", "identification": "Ada"})
    );
    let trail = backend.routes_seen();
    assert!(trail.contains(&"POST /testset-sessions/TSS1/reset".to_string()));
    assert!(trail.contains(&"DELETE /testset-sessions/TSS1".to_string()));
}

#[tokio::test]
async fn testset_results() {
    let result = json!({
        "testsetSessionId": "TSS1",
        "testsetId": "TS1",
        "state": "completed",
        "sessions": [{"code": "S1", "assessmentId": "A1", "sessionState": "scored"}]
    });
    let backend = Backend::new()
        .data("GET /testsets/TS1/results", json!([result.clone()]))
        .data("GET /testset-sessions/TSS1/result", result.clone())
        .on("GET /testsets/TS1/results/download", |_| {
            HttpResponse::new(200, "session;score\nTSS1;7\n")
        });
    let teacher = signed_in(&backend).await;

    let results = teacher.get_testset_results("TS1").await.unwrap();
    assert_eq!(results[0].sessions[0].session_state, SessionState::Scored);
    let one = teacher.get_testset_result("TSS1").await.unwrap();
    assert_eq!(one.state, TestsetState::Completed);
    let file = teacher.download_testset_results("TS1").await.unwrap();
    assert_eq!(file, b"session;score\nTSS1;7\n".to_vec());
}

#[tokio::test]
async fn item_statistics() {
    let report = json!({
        "assessmentId": "A1",
        "assessmentName": "Math",
        "lastUpdated": 1700000000,
        "deliveryId": "D1",
        "deliveryCode": "DC1",
        "itemStatistics": [{
            "itemId": "I1",
            "responseIdentifier": "RESPONSE",
            "count": 2,
            "numberCorrect": 1,
            "responses": [{"id": "U1", "value": "42", "count": 2, "score": 1, "scoreExternal": null}]
        }]
    });
    let backend = Backend::new()
        .data("GET /delivery/D1/itemStats", json!([report.clone()]))
        .data("GET /assessment/A1/itemStats", json!([report.clone()]))
        .data("POST /assessment/A1/itemStats/I1", json!(null));
    let teacher = signed_in(&backend).await;

    let by_delivery = teacher
        .get_item_stats_by_delivery("D1", StatsTarget::Teacher)
        .await
        .unwrap();
    assert_eq!(by_delivery[0].delivery_code.as_deref(), Some("DC1"));
    let responses = &by_delivery[0].item_statistics[0].responses;
    assert_eq!(responses[0].score, Some(1.0));
    assert_eq!(responses[0].score_external, None);
    teacher
        .get_item_stats_by_assessment("A1", StatsTarget::Reviewer)
        .await
        .unwrap();
    teacher
        .update_item_stat_response_score("I1", "A1", "U1", Some(0.5), StatsTarget::Reviewer)
        .await
        .unwrap();

    assert_eq!(backend.last("GET /delivery/D1/itemStats").query.as_deref(), Some("role=teacher"));
    assert_eq!(
        backend.last("GET /assessment/A1/itemStats").query.as_deref(),
        Some("role=reviewer")
    );
    assert_eq!(
        backend.last("POST /assessment/A1/itemStats/I1").json(),
        json!({"responseId": "U1", "scoreExternal": 0.5, "target": "reviewer"})
    );
}
