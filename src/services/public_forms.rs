//! Orchestration of the three public entry points
//!
//! `get_public_form` serves the cached projection when it can, but always
//! gates on a freshly read snapshot. `submit_response` never reads the cache.
//! View tracking, cache fills and activity records run as detached tasks;
//! their failures are logged and never reach the caller.
//!
//! Concurrent submits against a form one slot below `max_responses` may all
//! pass the gate and commit, overshooting the cap by at most the number of
//! racing requests minus one. The counter still matches the submission rows.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::constants::{public_form_key, ACTIVITY_NEW_RESPONSE, MSG_SUBMISSION_ACCEPTED};
use crate::db::FormStore;
use crate::error::{AppError, Result};
use crate::gate::{self, AccessDecision};
use crate::models::{
    ClientMeta, Form, NewActivity, NewSubmission, PublicForm, SubmitRequest, SubmitResponse,
};
use crate::security::{verify_password, visitor_fingerprint};
use crate::validation::{collect_known_values, ensure_required_fields, validate_metadata};

#[derive(Clone)]
pub struct PublicFormService {
    store: Arc<dyn FormStore>,
    cache: Cache,
    cache_ttl: Duration,
}

impl PublicFormService {
    pub fn new(store: Arc<dyn FormStore>, cache: Cache, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    /// `GET /f/{id}`
    pub async fn get_public_form(&self, form_id: &str, client: &ClientMeta) -> Result<PublicForm> {
        let key = public_form_key(form_id);

        if let Some(cached) = self.cache.get_json::<PublicForm>(&key).await {
            let snapshot = self.store.find_snapshot(form_id).await?;
            let decision = gate::evaluate(snapshot.as_ref(), Utc::now());
            self.track_view_unless_missing(form_id, decision, client);
            decision.into_result(form_id)?;

            debug!(form_id = form_id, "Serving public form from cache");
            return Ok(cached);
        }

        let form = self.store.find_form(form_id).await?;
        let snapshot = form.as_ref().map(Form::snapshot);
        let decision = gate::evaluate(snapshot.as_ref(), Utc::now());
        self.track_view_unless_missing(form_id, decision, client);
        decision.into_result(form_id)?;

        let Some(form) = form else {
            return Err(AppError::FormNotFound(form_id.to_string()));
        };

        let public = PublicForm::from(&form);
        self.fill_cache(key, public.clone());

        Ok(public)
    }

    /// `POST /f/{id}/validate-password`
    ///
    /// Only existence and the password are checked; a form without a password
    /// always validates.
    pub async fn validate_password(&self, form_id: &str, password: &str) -> Result<bool> {
        if password.is_empty() {
            return Err(AppError::Validation("password must not be empty".to_string()));
        }

        let hash = self
            .store
            .find_password_hash(form_id)
            .await?
            .ok_or_else(|| AppError::FormNotFound(form_id.to_string()))?;

        let Some(hash) = hash else {
            return Ok(true);
        };

        if !verify_password(password, &hash).await? {
            warn!(form_id = form_id, "Invalid form password attempt");
            return Err(AppError::PasswordInvalid);
        }

        Ok(true)
    }

    /// `POST /f/{id}/submit`
    pub async fn submit_response(
        &self,
        form_id: &str,
        request: SubmitRequest,
        client: &ClientMeta,
    ) -> Result<SubmitResponse> {
        let form = self.store.find_form(form_id).await?;
        let snapshot = form.as_ref().map(Form::snapshot);
        gate::evaluate(snapshot.as_ref(), Utc::now()).into_result(form_id)?;

        let Some(form) = form else {
            return Err(AppError::FormNotFound(form_id.to_string()));
        };

        if let Some(hash) = form.password_hash.as_deref() {
            let password = request
                .password
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or(AppError::PasswordRequired)?;

            if !verify_password(password, hash).await? {
                warn!(form_id = form_id, "Invalid form password on submit");
                return Err(AppError::PasswordInvalid);
            }
        }

        let fingerprint = visitor_fingerprint(client.ip.as_deref(), client.user_agent.as_deref());

        if !form.allow_multiple_submissions
            && self.store.has_submission_from(form_id, &fingerprint).await?
        {
            return Err(AppError::DuplicateSubmission);
        }

        ensure_required_fields(&form, &request.values)?;

        let metadata = request.metadata.unwrap_or_default();
        let time_spent = validate_metadata(&metadata)?;

        let submission = NewSubmission {
            form_id: form.id.clone(),
            fingerprint,
            ip_address: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            started_at: metadata.started_at,
            completed_at: metadata.completed_at,
            time_spent,
            values: collect_known_values(&form, &request.values),
        };

        let submission_id = self.store.create_submission(submission).await?;

        info!(
            form_id = form_id,
            submission_id = %submission_id,
            "Submission accepted"
        );

        self.record_new_response(&form);

        Ok(SubmitResponse {
            id: submission_id,
            message: MSG_SUBMISSION_ACCEPTED.to_string(),
        })
    }

    /// There is no row to reference for a missing form, so nothing is tracked
    fn track_view_unless_missing(
        &self,
        form_id: &str,
        decision: AccessDecision,
        client: &ClientMeta,
    ) {
        if decision == AccessDecision::NotFound {
            return;
        }

        let store = self.store.clone();
        let form_id = form_id.to_string();
        let fingerprint = visitor_fingerprint(client.ip.as_deref(), client.user_agent.as_deref());

        tokio::spawn(async move {
            match store.record_view(&form_id, &fingerprint).await {
                Ok(true) => debug!(form_id = %form_id, "New view recorded"),
                Ok(false) => debug!(form_id = %form_id, "Repeat view ignored"),
                Err(e) => warn!(form_id = %form_id, error = %e, "View tracking failed"),
            }
        });
    }

    fn fill_cache(&self, key: String, public: PublicForm) {
        let cache = self.cache.clone();
        let ttl = self.cache_ttl;

        tokio::spawn(async move {
            cache.set_json(&key, &public, Some(ttl)).await;
        });
    }

    fn record_new_response(&self, form: &Form) {
        let store = self.store.clone();
        let activity = NewActivity {
            user_id: form.user_id.clone(),
            form_id: Some(form.id.clone()),
            activity_type: ACTIVITY_NEW_RESPONSE,
            message: format!("New response received on \"{}\"", form.name),
        };

        tokio::spawn(async move {
            let form_id = activity.form_id.clone().unwrap_or_default();
            if let Err(e) = store.record_activity(activity).await {
                warn!(form_id = %form_id, error = %e, "Activity record failed");
            }
        });
    }
}
