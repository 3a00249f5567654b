//! Tools API client: package management and feedback.

use crate::account::AccountSession;
use crate::error::ClientResult;
use crate::models::{AssessmentSettings, Feedback, FeedbackReceipt, PackageInfo};
use crate::options::ClientOptions;
use qti_auth::AuthProvider;
use qti_http::{ApiRequest, AuthenticatedClient, MultipartPart};
use qti_storage::StorageKeys;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Uploads and settings changes may trigger package reprocessing.
const LONG_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const FEEDBACK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ToolsClient {
    account: AccountSession,
}

impl Deref for ToolsClient {
    type Target = AccountSession;

    fn deref(&self) -> &AccountSession {
        &self.account
    }
}

impl ToolsClient {
    pub fn new(options: &ClientOptions, provider: Arc<dyn AuthProvider>) -> ClientResult<Self> {
        Ok(Self {
            account: AccountSession::open(options, StorageKeys::TOOLS, provider)?,
        })
    }

    fn http(&self) -> &AuthenticatedClient {
        self.account.client()
    }

    /// Upload a QTI package archive.
    pub async fn upload_package(&self, file_name: &str, data: Vec<u8>) -> ClientResult<PackageInfo> {
        let size = data.len();
        let request = ApiRequest::post("/upload")
            .multipart(vec![
                MultipartPart::file("file", file_name, data).with_content_type("application/zip")
            ])
            .timeout(LONG_REQUEST_TIMEOUT);
        let package: PackageInfo = self.http().execute_json(request).await?;
        info!(package_id = %package.id, file_name, size, "Package uploaded");
        Ok(package)
    }

    pub async fn get_packages(&self) -> ClientResult<Vec<PackageInfo>> {
        let packages: Option<Vec<PackageInfo>> =
            self.http().execute_json(ApiRequest::get("/packages")).await?;
        Ok(packages.unwrap_or_default())
    }

    pub async fn get_package_info(&self, package_id: &str) -> ClientResult<PackageInfo> {
        Ok(self
            .http()
            .execute_json(ApiRequest::get(format!("/package/{package_id}")))
            .await?)
    }

    pub async fn delete_package(&self, package_id: &str) -> ClientResult<()> {
        self.http()
            .execute_unit(ApiRequest::delete(format!("/package/{package_id}")))
            .await?;
        info!(package_id, "Package deleted");
        Ok(())
    }

    pub async fn update_assessment_settings(
        &self,
        assessment_id: &str,
        settings: &AssessmentSettings,
    ) -> ClientResult<()> {
        let request = ApiRequest::post(format!("/assessment/{assessment_id}/settings"))
            .json(settings)?
            .timeout(LONG_REQUEST_TIMEOUT);
        Ok(self.http().execute_unit(request).await?)
    }

    /// Send a feedback report, optionally with a PNG screenshot.
    pub async fn submit_feedback(
        &self,
        feedback: &Feedback,
        screenshot: Option<Vec<u8>>,
    ) -> ClientResult<FeedbackReceipt> {
        let mut parts = vec![
            MultipartPart::text("type", feedback.kind.as_str()),
            MultipartPart::text("description", feedback.description.as_str()),
            MultipartPart::text("feedbackId", feedback.feedback_id.as_str()),
        ];
        if let Some(email) = feedback.email.as_deref().filter(|e| !e.is_empty()) {
            parts.push(MultipartPart::text("email", email));
        }
        if let Some(page_url) = feedback.page_url.as_deref().filter(|u| !u.is_empty()) {
            parts.push(MultipartPart::text("pageUrl", page_url));
        }
        if let Some(data) = screenshot {
            parts.push(
                MultipartPart::file("screenshot", "screenshot.png", data)
                    .with_content_type("image/png"),
            );
        }

        let request = ApiRequest::post("/feedback")
            .multipart(parts)
            .timeout(FEEDBACK_TIMEOUT);
        let receipt: Option<FeedbackReceipt> = self.http().execute_json(request).await?;
        info!(feedback_id = %feedback.feedback_id, kind = %feedback.kind, "Feedback submitted");
        Ok(receipt.unwrap_or_default())
    }
}
