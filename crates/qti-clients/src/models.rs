//! Wire models of the QTI delivery backend.
//!
//! Fields the clients do not interpret are optional or defaulted so that
//! backend additions never break decoding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle of one student session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotGenerated,
    NotAvailable,
    NotStarted,
    Started,
    Finished,
    Scored,
}

impl SessionState {
    /// Whether a student can still work in this session.
    pub fn is_open(self) -> bool {
        !matches!(
            self,
            SessionState::NotAvailable | SessionState::Finished | SessionState::Scored
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    NotStarted,
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentIdentification {
    Number,
    Name,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSettings {
    pub force_full_screen: bool,
    pub responsive: bool,
    pub backend_scoring: bool,
    pub student_identification: StudentIdentification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

/// An assessment as the teacher sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub package_id: String,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub is_demo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<AssessmentSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub item_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qti_version: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default)]
    pub assessments: Vec<Assessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: String,
    #[serde(default)]
    pub assessment_id: String,
    pub state: DeliveryState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    #[serde(default)]
    pub can_stop: bool,
    #[serde(default)]
    pub can_restart: bool,
}

/// A student session as the teacher sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub teacher_id: String,
    #[serde(default)]
    pub delivery_id: String,
    #[serde(default)]
    pub assessment_id: String,
    pub session_state: SessionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification: Option<String>,
    #[serde(default)]
    pub package_id: String,
    #[serde(default)]
    pub assessment_name: String,
    #[serde(default)]
    pub is_demo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_score: Option<f64>,
}

/// Assessment summary handed to students.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentInfo {
    pub assessment_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub package_id: String,
    #[serde(default)]
    pub is_demo: bool,
}

/// One assessment in a student's plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSession {
    pub assessment_id: String,
    #[serde(default)]
    pub assessment_name: String,
    #[serde(default)]
    pub package_id: String,
    pub session_state: SessionState,
}

impl From<&StudentSession> for AssessmentInfo {
    fn from(session: &StudentSession) -> Self {
        Self {
            assessment_id: session.assessment_id.clone(),
            name: session.assessment_name.clone(),
            package_id: session.package_id.clone(),
            is_demo: false,
        }
    }
}

/// What the backend tells a student after a code check or session start.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAppSessionInfo {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub teacher_id: String,
    #[serde(default)]
    pub is_demo: bool,
    #[serde(default)]
    pub sessions: Vec<StudentSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<AssessmentInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_assessment_id: Option<String>,
}

impl StudentAppSessionInfo {
    /// The assessment to continue with: the explicit one, else the first
    /// session still open.
    pub fn current_assessment(&self) -> Option<AssessmentInfo> {
        self.assessment.clone().or_else(|| {
            self.sessions
                .iter()
                .find(|s| s.session_state.is_open())
                .map(AssessmentInfo::from)
        })
    }
}

/// An item of an assessment, with its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInfo {
    pub identifier: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Saved progress of a student in one assessment.
///
/// Only `items` is interpreted; everything else round-trips untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SessionState>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Progress of a student through a test set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestsetState {
    NotStarted,
    InProgress,
    Completed,
    Paused,
}

/// An ordered group of assessments taken in one sitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub teacher_id: String,
    #[serde(default)]
    pub assessment_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessments: Option<Vec<Assessment>>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_demo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// Fields of a test set to create.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestset {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub assessment_ids: Vec<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_demo: Option<bool>,
}

/// Partial update of a test set; only the fields set are sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestsetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// A student's run through a test set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestsetSession {
    #[serde(default)]
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub testset_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testset: Option<Testset>,
    #[serde(default)]
    pub teacher_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    pub state: TestsetState,
    #[serde(default)]
    pub session_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<Session>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_session_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    #[serde(default)]
    pub is_demo: bool,
}

impl TestsetSession {
    /// The assessment session the student is working on, when populated.
    pub fn current_session(&self) -> Option<&Session> {
        let sessions = self.sessions.as_ref()?;
        sessions.get(self.current_session_index.unwrap_or(0))
    }
}

/// Parameters for opening a test set session for a student.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestsetSession {
    pub testset_id: String,
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestsetResult {
    pub testset_session_id: String,
    #[serde(default)]
    pub testset_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification: Option<String>,
    pub state: TestsetState,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// Whose scores item statistics are read or written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsTarget {
    #[default]
    Teacher,
    Reviewer,
}

impl StatsTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            StatsTarget::Teacher => "teacher",
            StatsTarget::Reviewer => "reviewer",
        }
    }
}

/// One distinct answer given to an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueResponse {
    pub id: String,
    #[serde(default)]
    pub response_identifier: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub session_ids: Vec<String>,
    #[serde(default)]
    pub response_ids: Vec<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub score_external: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStatistics {
    pub item_id: String,
    #[serde(default)]
    pub response_identifier: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub number_correct: u32,
    #[serde(default)]
    pub responses: Vec<UniqueResponse>,
}

/// Item statistics of an assessment, or of one of its deliveries when the
/// delivery fields are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStatsReport {
    pub assessment_id: String,
    #[serde(default)]
    pub assessment_name: String,
    #[serde(default)]
    pub last_updated: i64,
    #[serde(default)]
    pub item_statistics: Vec<ItemStatistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_code: Option<String>,
}

/// A report from the feedback form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feedback {
    pub kind: String,
    pub description: String,
    pub feedback_id: String,
    pub email: Option<String>,
    pub page_url: Option<String>,
}

/// Acknowledgement of a feedback submission.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackReceipt {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_state_wire_names() {
        let state: SessionState = serde_json::from_value(json!("not_started")).unwrap();
        assert_eq!(state, SessionState::NotStarted);
        assert_eq!(serde_json::to_value(SessionState::Scored).unwrap(), json!("scored"));
    }

    #[test]
    fn test_current_assessment_prefers_explicit() {
        let info: StudentAppSessionInfo = serde_json::from_value(json!({
            "code": "ABC",
            "assessment": {"assessmentId": "A2"},
            "sessions": [{"assessmentId": "A1", "sessionState": "started"}]
        }))
        .unwrap();
        assert_eq!(info.current_assessment().unwrap().assessment_id, "A2");
    }

    #[test]
    fn test_current_assessment_skips_closed_sessions() {
        let info: StudentAppSessionInfo = serde_json::from_value(json!({
            "sessions": [
                {"assessmentId": "A1", "sessionState": "finished"},
                {"assessmentId": "A2", "sessionState": "not_available"},
                {"assessmentId": "A3", "assessmentName": "Math", "sessionState": "not_started"}
            ]
        }))
        .unwrap();
        let current = info.current_assessment().unwrap();
        assert_eq!(current.assessment_id, "A3");
        assert_eq!(current.name, "Math");
    }

    #[test]
    fn test_test_context_keeps_unknown_fields() {
        let raw = json!({"items": [], "navItemId": "I1", "state": "started"});
        let context: TestContext = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(context.items, Some(vec![]));
        assert_eq!(serde_json::to_value(&context).unwrap(), raw);
    }

    #[test]
    fn test_current_testset_session_follows_index() {
        let session: TestsetSession = serde_json::from_value(json!({
            "code": "TS-1",
            "state": "in_progress",
            "currentSessionIndex": 1,
            "sessions": [
                {"code": "S1", "assessmentId": "A1", "sessionState": "finished"},
                {"code": "S2", "assessmentId": "A2", "sessionState": "started"}
            ]
        }))
        .unwrap();
        assert_eq!(session.state, TestsetState::InProgress);
        assert_eq!(session.current_session().unwrap().assessment_id, "A2");

        let bare: TestsetSession =
            serde_json::from_value(json!({"code": "TS-2", "state": "not_started"})).unwrap();
        assert!(bare.current_session().is_none());
    }

    #[test]
    fn test_testset_update_sends_only_set_fields() {
        let update = TestsetUpdate {
            is_active: Some(false),
            ..TestsetUpdate::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"isActive": false}));
    }
}
