use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Publication state, stored as `ACTIVE` / `INACTIVE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    Active,
    Inactive,
}

impl FromStr for FormStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(FormStatus::Active),
            "INACTIVE" => Ok(FormStatus::Inactive),
            other => Err(format!("unknown form status: {other}")),
        }
    }
}

/// The minimal state the access gate needs; cheap to read on every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    pub id: String,
    pub status: FormStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_responses: Option<i32>,
    pub total_responses: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub id: String,
    pub field_type: String,
    pub label: String,
    /// Key of this field in a submission's value map; unique within the form
    pub name: String,
    pub required: bool,
    pub config: Value,
}

/// Full form as loaded by the public path
#[derive(Debug, Clone)]
pub struct Form {
    pub id: String,
    /// Owner, used to stamp activity records
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: FormStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_responses: Option<i32>,
    pub total_responses: i32,
    pub allow_multiple_submissions: bool,
    pub password_hash: Option<String>,
    /// Ordered by position
    pub fields: Vec<Field>,
}

impl Form {
    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            id: self.id.clone(),
            status: self.status,
            expires_at: self.expires_at,
            max_responses: self.max_responses,
            total_responses: self.total_responses,
        }
    }

    pub fn requires_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Public-safe projection served to respondents and cached under
/// `public-form:{id}`. Carries no gating state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicForm {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub requires_password: bool,
    pub fields: Vec<PublicField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicField {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub label: String,
    pub name: String,
    pub required: bool,
    pub config: Value,
}

impl From<&Form> for PublicForm {
    fn from(form: &Form) -> Self {
        Self {
            id: form.id.clone(),
            name: form.name.clone(),
            description: form.description.clone(),
            requires_password: form.requires_password(),
            fields: form
                .fields
                .iter()
                .map(|field| PublicField {
                    id: field.id.clone(),
                    field_type: field.field_type.clone(),
                    label: field.label.clone(),
                    name: field.name.clone(),
                    required: field.required,
                    config: field.config.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_form() -> Form {
        Form {
            id: "form-1".to_string(),
            user_id: "owner-1".to_string(),
            name: "Feedback".to_string(),
            description: None,
            status: FormStatus::Active,
            expires_at: None,
            max_responses: Some(10),
            total_responses: 2,
            allow_multiple_submissions: true,
            password_hash: Some("$2b$04$hash".to_string()),
            fields: vec![Field {
                id: "field-1".to_string(),
                field_type: "text".to_string(),
                label: "Name".to_string(),
                name: "name".to_string(),
                required: true,
                config: json!({ "maxLength": 80 }),
            }],
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("ACTIVE".parse::<FormStatus>().unwrap(), FormStatus::Active);
        assert_eq!("INACTIVE".parse::<FormStatus>().unwrap(), FormStatus::Inactive);
        assert!("archived".parse::<FormStatus>().is_err());
    }

    #[test]
    fn test_public_projection_hides_private_state() {
        let public = PublicForm::from(&sample_form());
        let body = serde_json::to_value(&public).unwrap();

        assert_eq!(body["requiresPassword"], true);
        assert_eq!(body["fields"][0]["type"], "text");
        assert_eq!(body["fields"][0]["config"]["maxLength"], 80);
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("totalResponses").is_none());
        assert!(body.get("status").is_none());
    }

    #[test]
    fn test_snapshot_copies_gate_state() {
        let snapshot = sample_form().snapshot();
        assert_eq!(snapshot.max_responses, Some(10));
        assert_eq!(snapshot.total_responses, 2);
        assert_eq!(snapshot.status, FormStatus::Active);
    }
}
