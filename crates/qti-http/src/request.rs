//! Request and response values passed through the pipeline.

use crate::ApiError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// One part of a multipart form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl MultipartPart {
    /// A file part.
    pub fn file(name: impl Into<String>, file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: None,
            data,
        }
    }

    /// A plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: value.into().into_bytes(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Request body, owned so that it can be sent again on replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Bytes {
        content_type: Option<String>,
        data: Vec<u8>,
    },
    Multipart(Vec<MultipartPart>),
}

/// A request as the caller describes it, relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: RequestBody,
    timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a caller header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn json_value(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn bytes(mut self, content_type: Option<String>, data: Vec<u8>) -> Self {
        self.body = RequestBody::Bytes { content_type, data };
        self
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// Override the transport timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolve against `base_url` and capture the request for dispatch.
    pub fn into_pending(self, base_url: &Url) -> Result<PendingRequest, ApiError> {
        let url = resolve_url(base_url, &self.path)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidRequest(format!("header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::InvalidRequest(format!("header {}: {}", name, e)))?;
            headers.append(name, value);
        }

        Ok(PendingRequest {
            id: Uuid::new_v4(),
            method: self.method,
            url,
            headers,
            body: self.body,
            timeout: self.timeout,
            retried: false,
        })
    }
}

/// Join a request path onto the API base URL.
///
/// Absolute `http(s)` URLs are accepted only on the base URL's origin, so
/// credentials are never sent to another host. Otherwise the path is
/// appended to the base, collapsing the slash between them.
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ApiError> {
    if path.starts_with("http://") || path.starts_with("https://") {
        let url = Url::parse(path)?;
        if url.origin() != base_url.origin() {
            return Err(ApiError::InvalidRequest(format!(
                "{} is outside the API origin {}",
                url,
                base_url.origin().ascii_serialization()
            )));
        }
        return Ok(url);
    }
    let joined = format!(
        "{}/{}",
        base_url.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}

/// A captured outgoing request.
///
/// Created once per call; replayed at most once, with `retried` set.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// Correlation id for logs.
    pub id: Uuid,
    pub method: Method,
    pub url: Url,
    /// Caller headers, before decoration.
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
    pub retried: bool,
}

/// Raw response handed back by a transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        let mut response = Self::new(status, body.to_string());
        response.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Successful response body after envelope unwrapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Raw(Vec<u8>),
}

/// Response returned to callers.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub payload: Payload,
}

impl ApiResponse {
    /// Decode the payload into `T`. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self.payload {
            Payload::Json(value) => Ok(serde_json::from_value(value)?),
            Payload::Raw(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                Ok(serde_json::from_value(Value::Null)?)
            }
            Payload::Raw(bytes) => Ok(serde_json::from_slice(&bytes)?),
        }
    }

    /// The payload as a JSON value; `Null` for empty or non-JSON bodies.
    pub fn into_value(self) -> Value {
        match self.payload {
            Payload::Json(value) => value,
            Payload::Raw(_) => Value::Null,
        }
    }

    /// The payload as text. JSON payloads are re-rendered.
    pub fn text(self) -> String {
        match self.payload {
            Payload::Json(Value::String(s)) => s,
            Payload::Json(value) => value.to_string(),
            Payload::Raw(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// The payload as bytes, for downloads.
    pub fn into_bytes(self) -> Vec<u8> {
        match self.payload {
            Payload::Json(value) => value.to_string().into_bytes(),
            Payload::Raw(bytes) => bytes,
        }
    }
}
