use serde_json::{Map, Value};

use crate::error::AppError;
use crate::models::{Form, NewSubmissionValue, SubmissionMetadata};

/// `null` and `""` count as unanswered
pub fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Labels of every required field without an answer, in field order
pub fn missing_required_labels<'a>(form: &'a Form, values: &Map<String, Value>) -> Vec<&'a str> {
    form.fields
        .iter()
        .filter(|field| field.required && is_absent(values.get(&field.name)))
        .map(|field| field.label.as_str())
        .collect()
}

/// Reject the submission with one error listing every missing label
pub fn ensure_required_fields(form: &Form, values: &Map<String, Value>) -> Result<(), AppError> {
    let missing = missing_required_labels(form, values);
    if missing.is_empty() {
        return Ok(());
    }

    Err(AppError::Validation(format!(
        "Required fields missing: {}",
        missing.join(", ")
    )))
}

/// Keep answers whose key names a field of the form; unknown keys are dropped
pub fn collect_known_values(form: &Form, values: &Map<String, Value>) -> Vec<NewSubmissionValue> {
    values
        .iter()
        .filter_map(|(key, value)| {
            form.field_by_name(key).map(|field| NewSubmissionValue {
                field_id: field.id.clone(),
                field_type: field.field_type.clone(),
                value: value.clone(),
            })
        })
        .collect()
}

/// Returns `time_spent` narrowed to the stored column width
pub fn validate_metadata(metadata: &SubmissionMetadata) -> Result<Option<i32>, AppError> {
    match metadata.time_spent {
        None => Ok(None),
        Some(seconds) if seconds > 0 => i32::try_from(seconds)
            .map(Some)
            .map_err(|_| AppError::Validation("metadata.timeSpent is too large".to_string())),
        Some(_) => Err(AppError::Validation(
            "metadata.timeSpent must be a positive integer".to_string(),
        )),
    }
}
