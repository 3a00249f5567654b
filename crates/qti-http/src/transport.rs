//! HTTP transport capability.

use crate::request::{HttpResponse, PendingRequest, RequestBody};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Network-level transport failure. HTTP statuses are never errors here.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("could not build request: {0}")]
    Build(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Sends a fully decorated request and returns whatever status came back.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `headers` are the decorated headers; `request.headers` are the
    /// caller's originals and must not be sent instead.
    async fn send(
        &self,
        request: &PendingRequest,
        headers: HeaderMap,
    ) -> Result<HttpResponse, TransportError>;
}

/// Default transport on `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    default_timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new(default_timeout: Option<Duration>) -> Self {
        Self::with_client(reqwest::Client::new(), default_timeout)
    }

    /// Wrap a preconfigured client (proxies, extra root certificates).
    pub fn with_client(client: reqwest::Client, default_timeout: Option<Duration>) -> Self {
        Self {
            client,
            default_timeout,
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

fn build_form(parts: &[crate::request::MultipartPart]) -> Result<reqwest::multipart::Form, TransportError> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        let mut body = reqwest::multipart::Part::bytes(part.data.clone());
        if let Some(file_name) = &part.file_name {
            body = body.file_name(file_name.clone());
        }
        if let Some(content_type) = &part.content_type {
            body = body
                .mime_str(content_type)
                .map_err(|e| TransportError::Build(format!("part {}: {}", part.name, e)))?;
        }
        form = form.part(part.name.clone(), body);
    }
    Ok(form)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &PendingRequest,
        headers: HeaderMap,
    ) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(headers);

        if let Some(timeout) = request.timeout.or(self.default_timeout) {
            builder = builder.timeout(timeout);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Bytes { content_type, data } => {
                let builder = match content_type {
                    Some(ct) => builder.header(reqwest::header::CONTENT_TYPE, ct.as_str()),
                    None => builder,
                };
                builder.body(data.clone())
            }
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify)?.to_vec();

        debug!(
            request_id = %request.id,
            status,
            bytes = body.len(),
            "Transport response"
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Http(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ApiRequest, MultipartPart};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use url::Url;

    /// Accept one connection, capture the request head and reply with `reply`.
    async fn one_shot_server(reply: &'static str) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let mut seen = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                seen.extend_from_slice(&buf[..n]);
                if n == 0 || seen.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&seen).into_owned()
        });
        (url, handle)
    }

    #[tokio::test]
    async fn test_non_success_status_is_a_response() {
        let (base, server) = one_shot_server(
            "HTTP/1.1 401 Unauthorized\r\ncontent-length: 2\r\nconnection: close\r\n\r\nno",
        )
        .await;

        let pending = ApiRequest::get("/assessments").into_pending(&base).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer T1".parse().unwrap());

        let response = ReqwestTransport::default().send(&pending, headers).await.unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(response.body, b"no");

        let head = server.await.unwrap();
        assert!(head.starts_with("GET /assessments HTTP/1.1"));
        assert!(head.to_ascii_lowercase().contains("authorization: bearer t1"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = Url::parse(&format!("http://{}/", addr)).unwrap();
        let pending = ApiRequest::get("/x").into_pending(&base).unwrap();
        let err = ReqwestTransport::default()
            .send(&pending, HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_) | TransportError::Http(_)));
    }

    #[test]
    fn test_build_form_rejects_bad_mime() {
        let parts = vec![MultipartPart::file("file", "p.zip", vec![1]).with_content_type("not a mime")];
        assert!(matches!(build_form(&parts), Err(TransportError::Build(_))));
    }
}
