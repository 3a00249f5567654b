//! CLI command implementations.

mod api;
mod auth;

pub use api::{assessments, deliveries, get, packages, results, upload};
pub use auth::{login, logout, status};

use anyhow::{Context as _, Result};
use clap::ValueEnum;
use qti_auth::FirebaseAuthProvider;
use qti_clients::{AccountSession, ClientOptions, TeacherClient, ToolsClient};
use qti_config::{Config, Paths};
use qti_http::ErrorCallback;
use qti_storage::FileStore;
use std::sync::Arc;
use tracing::warn;

/// Which account API a command talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Role {
    #[default]
    Teacher,
    Tools,
}

/// Everything a command needs to build a client.
pub struct Context {
    pub config: Config,
    pub paths: Paths,
    pub role: Role,
}

impl Context {
    fn options(&self) -> Result<ClientOptions> {
        let credentials_file = self.config.credentials_file(&self.paths);
        let storage = FileStore::open(&credentials_file).with_context(|| {
            format!("Failed to open credentials at {}", credentials_file.display())
        })?;

        let on_error: ErrorCallback = Arc::new(|error| {
            warn!(
                kind = ?error.kind(),
                status = ?error.status(),
                transient = error.is_transient(),
                error = %error,
                "API request failed"
            );
        });

        Ok(
            ClientOptions::new(self.config.api_url()?, Arc::new(storage))
                .app_id(self.config.app_id.clone())
                .admin(self.config.admin)
                .timeout(self.config.request_timeout())
                .on_error(on_error),
        )
    }

    fn provider(&self) -> Result<Arc<FirebaseAuthProvider>> {
        Ok(Arc::new(FirebaseAuthProvider::new(
            self.config.firebase_api_key()?,
        )))
    }

    pub fn teacher(&self) -> Result<TeacherClient> {
        Ok(TeacherClient::new(&self.options()?, self.provider()?)?)
    }

    pub fn tools(&self) -> Result<ToolsClient> {
        Ok(ToolsClient::new(&self.options()?, self.provider()?)?)
    }

    /// Account session for the selected role.
    pub fn account(&self) -> Result<AccountSession> {
        Ok(match self.role {
            Role::Teacher => (*self.teacher()?).clone(),
            Role::Tools => (*self.tools()?).clone(),
        })
    }

    fn require_login(&self, account: &AccountSession) -> Result<()> {
        if !account.is_logged_in() {
            anyhow::bail!("Not logged in. Run 'qti login --role {}' first", self.role_name());
        }
        Ok(())
    }

    fn role_name(&self) -> &'static str {
        match self.role {
            Role::Teacher => "teacher",
            Role::Tools => "tools",
        }
    }
}
