//! Storage key construction.

use url::Url;

/// Namespaces used by the client variants.
pub struct StorageKeys;

impl StorageKeys {
    /// Teacher client credentials
    pub const TEACHER: &'static str = "qti-teacher";

    /// Tools client credentials
    pub const TOOLS: &'static str = "qti-tools";

    /// Student client credentials
    pub const STUDENT: &'static str = "qti-student";
}

/// Composite key under which one client's credentials are persisted.
///
/// The key combines the client namespace, the application id, the backend
/// host and the authentication provider id, so that clients for different
/// applications, backends or providers never read each other's tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialKey {
    namespace: String,
    app_id: String,
    host: String,
    provider_id: String,
}

impl CredentialKey {
    /// Build a key from its parts.
    pub fn new(
        namespace: impl Into<String>,
        app_id: impl Into<String>,
        host: impl Into<String>,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            app_id: app_id.into(),
            host: host.into(),
            provider_id: provider_id.into(),
        }
    }

    /// Build a key for a backend URL, deriving the host part from it.
    pub fn for_backend(namespace: &str, app_id: &str, backend: &Url, provider_id: &str) -> Self {
        Self::new(namespace, app_id, host_discriminator(backend), provider_id)
    }

    /// The backend host part of the key.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The rendered storage key.
    pub fn as_storage_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.namespace, self.app_id, self.host, self.provider_id
        )
    }
}

impl std::fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_storage_key())
    }
}

/// Host plus explicit port, e.g. `api.example.com` or `localhost:8080`.
fn host_discriminator(url: &Url) -> String {
    let host = url.host_str().unwrap_or("local");
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
