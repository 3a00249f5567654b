//! Teacher API client.

use crate::account::AccountSession;
use crate::error::ClientResult;
use crate::models::{
    Assessment, Delivery, ItemStatsReport, NewTestset, NewTestsetSession, PackageInfo, Session,
    StatsTarget, Testset, TestsetResult, TestsetSession, TestsetUpdate,
};
use crate::options::ClientOptions;
use qti_auth::AuthProvider;
use qti_http::{ApiRequest, AuthenticatedClient};
use qti_storage::StorageKeys;
use serde::Deserialize;
use serde_json::{json, Value};
use std::ops::Deref;
use std::sync::Arc;

#[derive(Deserialize)]
struct AssessmentList {
    #[serde(default)]
    assessments: Vec<Assessment>,
}

#[derive(Deserialize)]
struct PackageList {
    #[serde(default)]
    packages: Vec<PackageInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreResult {
    scored_sessions: u64,
}

/// Client for the teacher dashboard API.
///
/// Account operations (`authenticate`, `logout`, ...) come from the
/// [`AccountSession`] it dereferences to.
#[derive(Debug, Clone)]
pub struct TeacherClient {
    account: AccountSession,
}

impl Deref for TeacherClient {
    type Target = AccountSession;

    fn deref(&self) -> &AccountSession {
        &self.account
    }
}

impl TeacherClient {
    pub fn new(options: &ClientOptions, provider: Arc<dyn AuthProvider>) -> ClientResult<Self> {
        Ok(Self {
            account: AccountSession::open(options, StorageKeys::TEACHER, provider)?,
        })
    }

    fn http(&self) -> &AuthenticatedClient {
        self.account.client()
    }

    /// Record a teacher activity.
    pub async fn log(&self, kind: &str, data: Value) -> ClientResult<Value> {
        let request = ApiRequest::post("/log").json_value(json!({ "type": kind, "data": data }));
        Ok(self.http().execute(request).await?.into_value())
    }

    pub async fn get_assessments(&self) -> ClientResult<Vec<Assessment>> {
        let list: Option<AssessmentList> =
            self.http().execute_json(ApiRequest::get("/assessments")).await?;
        Ok(list.map(|l| l.assessments).unwrap_or_default())
    }

    pub async fn get_packages(&self) -> ClientResult<Vec<PackageInfo>> {
        let list: Option<PackageList> =
            self.http().execute_json(ApiRequest::get("/packages")).await?;
        Ok(list.map(|l| l.packages).unwrap_or_default())
    }

    pub async fn get_assessment(&self, assessment_id: &str) -> ClientResult<Assessment> {
        Ok(self
            .http()
            .execute_json(ApiRequest::get(format!("/assessment/{assessment_id}")))
            .await?)
    }

    pub async fn update_assessment_name(
        &self,
        assessment_id: &str,
        name: &str,
    ) -> ClientResult<Assessment> {
        let request = ApiRequest::post("/assessment/updateName")
            .json_value(json!({ "assessmentId": assessment_id, "name": name }));
        Ok(self.http().execute_json(request).await?)
    }

    pub async fn delete_student(&self, code: &str) -> ClientResult<()> {
        Ok(self
            .http()
            .execute_unit(ApiRequest::delete(format!("/session/{code}")))
            .await?)
    }

    pub async fn add_student_identification(
        &self,
        code: &str,
        identification: &str,
    ) -> ClientResult<()> {
        let request = ApiRequest::post("/student/update")
            .json_value(json!({ "code": code, "identification": identification }));
        Ok(self.http().execute_unit(request).await?)
    }

    pub async fn reset_session(&self, code: &str) -> ClientResult<()> {
        let request = ApiRequest::post("/session/reset").json_value(json!({ "code": code }));
        Ok(self.http().execute_unit(request).await?)
    }

    pub async fn reopen_session(&self, code: &str) -> ClientResult<()> {
        let request = ApiRequest::post("/session/reopen").json_value(json!({ "code": code }));
        Ok(self.http().execute_unit(request).await?)
    }

    pub async fn update_session(
        &self,
        code: &str,
        assessment_id: &str,
        session: &Session,
    ) -> ClientResult<()> {
        let request = ApiRequest::post("/session/update").json(&json!({
            "code": code,
            "assessmentId": assessment_id,
            "session": session,
        }))?;
        Ok(self.http().execute_unit(request).await?)
    }

    /// Generate student sessions, either `count` fresh codes or one per
    /// delivery code.
    pub async fn plan_students(
        &self,
        count: Option<u32>,
        delivery_codes: Option<Vec<String>>,
    ) -> ClientResult<Vec<Session>> {
        let request = ApiRequest::post("/plan")
            .json_value(json!({ "count": count, "deliveryCodes": delivery_codes }));
        Ok(self.http().execute_json(request).await?)
    }

    pub async fn get_sessions(&self) -> ClientResult<Vec<Session>> {
        Ok(self.http().execute_json(ApiRequest::get("/sessions")).await?)
    }

    pub async fn create_delivery(&self, assessment_id: &str) -> ClientResult<Delivery> {
        let request = ApiRequest::post("/delivery/create")
            .json_value(json!({ "assessmentId": assessment_id }));
        Ok(self.http().execute_json(request).await?)
    }

    pub async fn delete_delivery(&self, delivery_code: &str) -> ClientResult<()> {
        Ok(self
            .http()
            .execute_unit(ApiRequest::delete(format!("/delivery/{delivery_code}")))
            .await?)
    }

    pub async fn update_delivery_name(
        &self,
        delivery_code: &str,
        name: &str,
    ) -> ClientResult<Delivery> {
        let request = ApiRequest::post("/delivery/updateName")
            .json_value(json!({ "code": delivery_code, "name": name }));
        Ok(self.http().execute_json(request).await?)
    }

    pub async fn start_delivery(&self, assessment_id: &str) -> ClientResult<Delivery> {
        let request =
            ApiRequest::post("/delivery/start").json_value(json!({ "code": assessment_id }));
        Ok(self.http().execute_json(request).await?)
    }

    pub async fn stop_delivery(&self, delivery_code: &str) -> ClientResult<Delivery> {
        let request =
            ApiRequest::post("/delivery/stop").json_value(json!({ "code": delivery_code }));
        Ok(self.http().execute_json(request).await?)
    }

    pub async fn get_assessment_deliveries(
        &self,
        assessment_id: &str,
    ) -> ClientResult<Vec<Delivery>> {
        Ok(self
            .http()
            .execute_json(ApiRequest::get(format!("/assessment/{assessment_id}/deliveries")))
            .await?)
    }

    /// Results of one delivery as CSV.
    pub async fn download_results_by_delivery_code(
        &self,
        delivery_code: &str,
    ) -> ClientResult<Vec<u8>> {
        let response = self
            .http()
            .execute(ApiRequest::get(format!("/delivery/{delivery_code}/csv")))
            .await?;
        Ok(response.into_bytes())
    }

    /// Results of every delivery of an assessment as CSV.
    pub async fn download_results_by_assessment_id(
        &self,
        assessment_id: &str,
    ) -> ClientResult<Vec<u8>> {
        let response = self
            .http()
            .execute(ApiRequest::get(format!("/assessment/{assessment_id}/csv")))
            .await?;
        Ok(response.into_bytes())
    }

    /// Score all sessions of a delivery; returns how many were scored.
    pub async fn score_delivery(&self, delivery_id: &str) -> ClientResult<u64> {
        let result: ScoreResult = self
            .http()
            .execute_json(ApiRequest::post(format!("/delivery/{delivery_id}/score")))
            .await?;
        Ok(result.scored_sessions)
    }

    pub async fn get_item_stats_by_delivery(
        &self,
        delivery_id: &str,
        target: StatsTarget,
    ) -> ClientResult<Vec<ItemStatsReport>> {
        let path = format!("/delivery/{delivery_id}/itemStats?role={}", target.as_str());
        Ok(self.http().execute_json(ApiRequest::get(path)).await?)
    }

    pub async fn get_item_stats_by_assessment(
        &self,
        assessment_id: &str,
        target: StatsTarget,
    ) -> ClientResult<Vec<ItemStatsReport>> {
        let path = format!("/assessment/{assessment_id}/itemStats?role={}", target.as_str());
        Ok(self.http().execute_json(ApiRequest::get(path)).await?)
    }

    /// Override the score of one response; `None` clears the override.
    pub async fn update_item_stat_response_score(
        &self,
        item_identifier: &str,
        assessment_id: &str,
        response_id: &str,
        score_external: Option<f64>,
        target: StatsTarget,
    ) -> ClientResult<()> {
        let request =
            ApiRequest::post(format!("/assessment/{assessment_id}/itemStats/{item_identifier}"))
                .json_value(json!({
                    "responseId": response_id,
                    "scoreExternal": score_external,
                    "target": target,
                }));
        Ok(self.http().execute_unit(request).await?)
    }

    pub async fn create_testset(&self, testset: &NewTestset) -> ClientResult<Testset> {
        let request = ApiRequest::post("/testsets").json(testset)?;
        Ok(self.http().execute_json(request).await?)
    }

    pub async fn update_testset(
        &self,
        testset_id: &str,
        updates: &TestsetUpdate,
    ) -> ClientResult<Testset> {
        let request = ApiRequest::put(format!("/testsets/{testset_id}")).json(updates)?;
        Ok(self.http().execute_json(request).await?)
    }

    pub async fn delete_testset(&self, testset_id: &str) -> ClientResult<()> {
        Ok(self
            .http()
            .execute_unit(ApiRequest::delete(format!("/testsets/{testset_id}")))
            .await?)
    }

    pub async fn get_testsets(&self) -> ClientResult<Vec<Testset>> {
        let testsets: Option<Vec<Testset>> =
            self.http().execute_json(ApiRequest::get("/testsets")).await?;
        Ok(testsets.unwrap_or_default())
    }

    pub async fn get_testset(&self, testset_id: &str) -> ClientResult<Testset> {
        Ok(self
            .http()
            .execute_json(ApiRequest::get(format!("/testsets/{testset_id}")))
            .await?)
    }

    pub async fn create_testset_session(
        &self,
        session: &NewTestsetSession,
    ) -> ClientResult<TestsetSession> {
        let request = ApiRequest::post("/testset-sessions").json(session)?;
        Ok(self.http().execute_json(request).await?)
    }

    pub async fn get_testset_session(
        &self,
        testset_session_id: &str,
    ) -> ClientResult<TestsetSession> {
        Ok(self
            .http()
            .execute_json(ApiRequest::get(format!("/testset-sessions/{testset_session_id}")))
            .await?)
    }

    /// Every test set session of the teacher.
    pub async fn get_testset_sessions(&self) -> ClientResult<Vec<TestsetSession>> {
        let sessions: Option<Vec<TestsetSession>> =
            self.http().execute_json(ApiRequest::get("/testsetsessions")).await?;
        Ok(sessions.unwrap_or_default())
    }

    pub async fn delete_testset_session(&self, testset_session_id: &str) -> ClientResult<()> {
        Ok(self
            .http()
            .execute_unit(ApiRequest::delete(format!("/testset-sessions/{testset_session_id}")))
            .await?)
    }

    pub async fn reset_testset_session(&self, testset_session_id: &str) -> ClientResult<()> {
        Ok(self
            .http()
            .execute_unit(ApiRequest::post(format!(
                "/testset-sessions/{testset_session_id}/reset"
            )))
            .await?)
    }

    pub async fn get_testset_results(&self, testset_id: &str) -> ClientResult<Vec<TestsetResult>> {
        let results: Option<Vec<TestsetResult>> = self
            .http()
            .execute_json(ApiRequest::get(format!("/testsets/{testset_id}/results")))
            .await?;
        Ok(results.unwrap_or_default())
    }

    pub async fn get_testset_result(&self, testset_session_id: &str) -> ClientResult<TestsetResult> {
        Ok(self
            .http()
            .execute_json(ApiRequest::get(format!(
                "/testset-sessions/{testset_session_id}/result"
            )))
            .await?)
    }

    /// Results of every session of a test set, as the exported file.
    pub async fn download_testset_results(&self, testset_id: &str) -> ClientResult<Vec<u8>> {
        let response = self
            .http()
            .execute(ApiRequest::get(format!("/testsets/{testset_id}/results/download")))
            .await?;
        Ok(response.into_bytes())
    }
}
