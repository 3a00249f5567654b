//! Credentials across client instances and session reset.

use super::harness::{seeded_credentials, MockProvider, MockTransport, TestClient};
use crate::{ApiRequest, GateState};
use qti_auth::{AuthenticationMethod, SignIn};
use qti_storage::MemoryStore;
use std::sync::Arc;

/// Credentials written by one client are read back by a fresh one on the
/// same storage and key.
#[tokio::test]
async fn credentials_round_trip_through_fresh_client() {
    let storage = Arc::new(MemoryStore::new());
    let first = TestClient::with_storage(
        MockTransport::always(200),
        MockProvider::issuing("T2"),
        storage.clone(),
    )
    .logged_in(AuthenticationMethod::Code {
        code: "ABC".to_string(),
    });

    let second = TestClient::with_storage(
        MockTransport::always(200),
        MockProvider::issuing("T2"),
        storage,
    );

    assert_eq!(
        second.client.credentials().current(),
        first.client.credentials().current()
    );
    assert_eq!(
        second.client.credentials().current(),
        Some(seeded_credentials(AuthenticationMethod::Code {
            code: "ABC".to_string()
        }))
    );
}

/// A refreshed token is persisted, not just cached.
#[tokio::test]
async fn refreshed_token_is_persisted() {
    let storage = Arc::new(MemoryStore::new());
    let t = TestClient::with_storage(
        MockTransport::accepting("T2"),
        MockProvider::issuing("T2"),
        storage.clone(),
    )
    .logged_in(AuthenticationMethod::Password);

    t.client.execute(ApiRequest::get("/sessions")).await.unwrap();

    let reopened =
        TestClient::with_storage(MockTransport::always(200), MockProvider::issuing("T3"), storage);
    assert_eq!(reopened.client.credentials().access_token().as_deref(), Some("T2"));
}

/// Resetting twice leaves the same empty state as resetting once.
#[tokio::test]
async fn session_reset_is_idempotent() {
    let t = TestClient::new(MockTransport::always(200), MockProvider::issuing("T2"))
        .logged_in(AuthenticationMethod::Password);

    t.client.session_reset();
    let once = (t.client.credentials().current(), t.stored(), t.client.gate_state());
    t.client.session_reset();
    let twice = (t.client.credentials().current(), t.stored(), t.client.gate_state());

    assert_eq!(once, twice);
    assert_eq!(once, (None, None, GateState::Idle));
}

/// Concurrent resets from many handles settle on the same empty state.
#[tokio::test]
async fn concurrent_resets_are_safe() {
    let t = TestClient::new(MockTransport::always(200), MockProvider::issuing("T2"))
        .logged_in(AuthenticationMethod::Password);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = t.client.clone();
            tokio::spawn(async move { client.session_reset() })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(!t.client.is_logged_in());
    assert!(t.stored().is_none());
}

/// Sign-in stores credentials and gives a fresh budget.
#[tokio::test]
async fn sign_in_installs_credentials() {
    let t = TestClient::new(MockTransport::always(200), MockProvider::issuing("T2"));

    let credentials = t
        .client
        .sign_in(
            &SignIn::Password {
                email: "t@example.com".to_string(),
                password: "pw".to_string(),
            },
            AuthenticationMethod::Password,
        )
        .await
        .unwrap();

    assert_eq!(credentials.access_token, "T-signin");
    assert_eq!(t.client.credentials().refresh_token().as_deref(), Some("R-signin"));
    assert_eq!(t.client.credentials().key(), "qti-test:app:api.example.com:mock");
    assert!(t.stored().is_some_and(|doc| doc.contains("T-signin")));
    assert_eq!(t.client.failure_budget(), 0);
}
