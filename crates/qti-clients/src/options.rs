//! Construction options shared by all clients.

use qti_auth::AuthProvider;
use qti_http::{ClientBuilder, ErrorCallback, HeaderContext, Transport};
use qti_storage::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Options for [`crate::TeacherClient`], [`crate::ToolsClient`] and
/// [`crate::StudentClient`].
///
/// `admin` and `check_access` only affect the account clients;
/// `xml_from_db` only the student client.
#[derive(Clone)]
pub struct ClientOptions {
    pub api_url: Url,
    pub app_id: Option<String>,
    pub admin: bool,
    /// Ask the backend (`POST /access`) whether a signed-in account may use
    /// the application before keeping its credentials.
    pub check_access: bool,
    pub xml_from_db: bool,
    pub timeout: Option<Duration>,
    pub transport: Option<Arc<dyn Transport>>,
    pub storage: Arc<dyn KeyValueStore>,
    pub on_error: Option<ErrorCallback>,
    pub refresh_on_auth_failure: bool,
}

impl ClientOptions {
    pub fn new(api_url: Url, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api_url,
            app_id: None,
            admin: false,
            check_access: true,
            xml_from_db: false,
            timeout: None,
            transport: None,
            storage,
            on_error: None,
            refresh_on_auth_failure: true,
        }
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn check_access(mut self, check_access: bool) -> Self {
        self.check_access = check_access;
        self
    }

    pub fn xml_from_db(mut self, xml_from_db: bool) -> Self {
        self.xml_from_db = xml_from_db;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    pub fn refresh_on_auth_failure(mut self, enabled: bool) -> Self {
        self.refresh_on_auth_failure = enabled;
        self
    }

    /// Pipeline builder for one client namespace.
    pub(crate) fn builder(
        &self,
        namespace: &str,
        provider: Arc<dyn AuthProvider>,
        headers: HeaderContext,
    ) -> ClientBuilder {
        let mut builder = ClientBuilder::new(
            self.api_url.clone(),
            namespace,
            provider,
            self.storage.clone(),
        )
        .header_context(headers)
        .refresh_on_auth_failure(self.refresh_on_auth_failure);

        if let Some(app_id) = &self.app_id {
            builder = builder.app_id(app_id.clone());
        }
        if let Some(transport) = &self.transport {
            builder = builder.transport(transport.clone());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(callback) = &self.on_error {
            builder = builder.on_error(callback.clone());
        }
        builder
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("api_url", &self.api_url.as_str())
            .field("app_id", &self.app_id)
            .field("admin", &self.admin)
            .field("check_access", &self.check_access)
            .field("xml_from_db", &self.xml_from_db)
            .field("timeout", &self.timeout)
            .field("refresh_on_auth_failure", &self.refresh_on_auth_failure)
            .finish()
    }
}
