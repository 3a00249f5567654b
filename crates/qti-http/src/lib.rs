//! Authenticated HTTP pipeline for QTI API clients.
//!
//! This crate provides:
//! - Header decoration (`Authorization: Bearer`, application and session headers)
//! - Response classification and a per-client refresh gate
//! - A single credential refresh and a single replay per failed request
//! - Session reset on irrecoverable authorization failures
//! - Response envelope unwrapping

mod client;
mod coordinator;
pub mod envelope;
mod error;
pub mod failure;
pub mod headers;
mod refresh_gate;
mod request;
mod transport;

pub use client::{AuthenticatedClient, ClientBuilder, ErrorCallback};
pub use coordinator::{plan_for, Reauthenticator, RefreshPlan};
pub use error::{ApiError, ApiResult, ErrorKind, ExhaustedStage, HttpFailure, IneligibleReason};
pub use headers::HeaderContext;
pub use refresh_gate::{GateState, RefreshGate, RefreshTicket};
pub use request::{
    resolve_url, ApiRequest, ApiResponse, HttpResponse, MultipartPart, Payload, PendingRequest,
    RequestBody,
};
pub use transport::{ReqwestTransport, Transport, TransportError};

pub use reqwest::header::HeaderMap;
pub use reqwest::Method;

#[cfg(test)]
mod tests;
