//! Response envelope unwrapping.
//!
//! Backends may wrap payloads as `{ success, message?, data }`. A body with
//! `success: false` is an application failure; a body with a `data` key and
//! `success` absent or `true` is replaced by its `data`. Anything else,
//! including bodies that are not JSON at all, passes through untouched.

use crate::request::Payload;
use serde_json::Value;

pub const DEFAULT_FAILURE_MESSAGE: &str = "API request failed";

/// Unwrap a successful response body. `Err` carries the failure message.
pub fn unwrap(body: &[u8]) -> Result<Payload, String> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => return Ok(Payload::Raw(body.to_vec())),
    };

    let Value::Object(mut object) = value else {
        return Ok(Payload::Json(value));
    };

    match object.get("success") {
        Some(Value::Bool(false)) => return Err(failure_message(object.get("message"))),
        Some(Value::Bool(true)) | None => {
            if let Some(data) = object.remove("data") {
                return Ok(Payload::Json(data));
            }
        }
        Some(_) => {}
    }

    Ok(Payload::Json(Value::Object(object)))
}

/// Falsy messages (`null`, `false`, `0`, `""`) fall back to the default.
fn failure_message(message: Option<&Value>) -> String {
    match message {
        None => DEFAULT_FAILURE_MESSAGE.to_string(),
        Some(value) if is_falsy(value) => DEFAULT_FAILURE_MESSAGE.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
