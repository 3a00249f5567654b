//! Outgoing header decoration.

use qti_auth::Credentials;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use tracing::warn;

pub const X_APP: &str = "x-app";
pub const X_ADMIN: &str = "x-admin";
pub const X_XML_FROM_DB: &str = "x-xml-from-db";
pub const X_ASSESSMENT: &str = "x-assessment";
pub const X_CODE: &str = "x-code";
pub const X_NAME: &str = "x-name";

/// Static, per-client header settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderContext {
    /// Sent as `x-app` when set.
    pub app_id: Option<String>,
    /// Sends `x-admin: true`.
    pub admin: bool,
    /// Sends `x-xml-from-db: true`.
    pub xml_from_db: bool,
}

/// Compute the headers to send for one attempt.
///
/// Caller headers are kept; the headers owned here replace any caller value
/// of the same name. Values that are not legal header values are skipped.
pub fn decorate(
    caller: &HeaderMap,
    credentials: Option<&Credentials>,
    context: &HeaderContext,
) -> HeaderMap {
    let mut headers = caller.clone();

    if let Some(credentials) = credentials {
        if !credentials.access_token.is_empty() {
            set(
                &mut headers,
                AUTHORIZATION,
                &format!("Bearer {}", credentials.access_token),
            );
        }
    }

    if let Some(app_id) = context.app_id.as_deref().filter(|v| !v.is_empty()) {
        set(&mut headers, HeaderName::from_static(X_APP), app_id);
    }
    if context.admin {
        set(&mut headers, HeaderName::from_static(X_ADMIN), "true");
    }
    if context.xml_from_db {
        set(&mut headers, HeaderName::from_static(X_XML_FROM_DB), "true");
    }

    if let Some(session) = credentials.map(|c| &c.context) {
        let pairs = [
            (X_ASSESSMENT, session.assessment_id.as_deref()),
            (X_CODE, session.code.as_deref()),
            (X_NAME, session.identification.as_deref()),
        ];
        for (name, value) in pairs {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                set(&mut headers, HeaderName::from_static(name), value);
            }
        }
    }

    headers
}

fn set(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(mut value) => {
            if name == AUTHORIZATION {
                value.set_sensitive(true);
            }
            headers.insert(name, value);
        }
        Err(_) => {
            // Never log the value itself: it may be a token.
            warn!(header = %name, "Skipping header with illegal value");
        }
    }
}
