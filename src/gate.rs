//! Access gate for public forms
//!
//! Evaluated on every request against a freshly read snapshot, whether or not
//! the form body came from cache. Check order is fixed: not found, inactive,
//! expired, full.

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{FormSnapshot, FormStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    NotFound,
    Inactive,
    Expired,
    Full,
}

impl AccessDecision {
    /// `Ok(())` when allowed, otherwise the matching client error
    pub fn into_result(self, form_id: &str) -> Result<(), AppError> {
        match self {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::NotFound => Err(AppError::FormNotFound(form_id.to_string())),
            AccessDecision::Inactive => Err(AppError::FormInactive),
            AccessDecision::Expired => Err(AppError::FormExpired),
            AccessDecision::Full => Err(AppError::FormFull),
        }
    }
}

pub fn evaluate(snapshot: Option<&FormSnapshot>, now: DateTime<Utc>) -> AccessDecision {
    let Some(snapshot) = snapshot else {
        return AccessDecision::NotFound;
    };

    if snapshot.status == FormStatus::Inactive {
        return AccessDecision::Inactive;
    }

    if snapshot.expires_at.is_some_and(|expires_at| expires_at < now) {
        return AccessDecision::Expired;
    }

    // Compared against responses committed before this request
    if snapshot
        .max_responses
        .is_some_and(|max| snapshot.total_responses >= max)
    {
        return AccessDecision::Full;
    }

    AccessDecision::Allowed
}
