//! Scenario tests for the authenticated request pipeline.
//!
//! - `harness.rs`          - Mock transport, mock provider, recording error callback
//! - `happy_path.rs`       - 401 → refresh → replay with the new token → 200
//! - `exhausted.rs`        - Refresh or replay refused → session reset, one callback
//! - `contention.rs`       - Concurrent 401s share a single refresh
//! - `retry_limit.rs`      - At most one replay; what is never retried
//! - `envelope.rs`         - Envelope unwrapping through the client
//! - `persistence.rs`      - Credential round trip and idempotent reset
//! - `reauthentication.rs` - Token exchange followed by session re-binding

mod envelope;
mod exhausted;
mod happy_path;
mod persistence;
