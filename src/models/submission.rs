use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /f/{id}/submit`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Answers keyed by field name
    #[serde(alias = "data")]
    pub values: Map<String, Value>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub metadata: Option<SubmissionMetadata>,
}

/// Optional client-side timing captured by the form renderer
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds between first interaction and submit
    #[serde(default)]
    pub time_spent: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidatePasswordRequest {
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatePasswordResponse {
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
    pub message: String,
}

/// Everything the store needs to persist one accepted submission
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub form_id: String,
    pub fingerprint: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent: Option<i32>,
    pub values: Vec<NewSubmissionValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmissionValue {
    pub field_id: String,
    pub field_type: String,
    pub value: Value,
}
