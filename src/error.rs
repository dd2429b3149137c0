use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::constants::*;
use crate::db::StoreError;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Form {0} not found")]
    FormNotFound(String),

    #[error("Form is inactive")]
    FormInactive,

    #[error("Form has expired")]
    FormExpired,

    #[error("Form reached its response limit")]
    FormFull,

    #[error("Form password required")]
    PasswordRequired,

    #[error("Form password invalid")]
    PasswordInvalid,

    #[error("Duplicate submission")]
    DuplicateSubmission,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_ms: u64 },

    #[error("No route for {0}")]
    RouteNotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Password hash error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::FormNotFound(_) | AppError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::FormInactive
            | AppError::FormExpired
            | AppError::FormFull
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PasswordRequired | AppError::PasswordInvalid => StatusCode::UNAUTHORIZED,
            AppError::DuplicateSubmission => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Store(_) | AppError::TaskJoin(_) | AppError::PasswordHash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code, independent of the HTTP status
    pub fn code(&self) -> &'static str {
        match self {
            AppError::FormNotFound(_) => "FORM_NOT_FOUND",
            AppError::FormInactive => "FORM_INACTIVE",
            AppError::FormExpired => "FORM_EXPIRED",
            AppError::FormFull => "FORM_FULL",
            AppError::PasswordRequired => "FORM_PASSWORD_REQUIRED",
            AppError::PasswordInvalid => "FORM_PASSWORD_INVALID",
            AppError::DuplicateSubmission => "SUBMISSION_DUPLICATE",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            AppError::RouteNotFound(_) => "NOT_FOUND",
            AppError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            AppError::Store(_) | AppError::TaskJoin(_) | AppError::PasswordHash(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::FormNotFound(form_id) => format!("Form {form_id} not found"),
            AppError::FormInactive => MSG_FORM_INACTIVE.to_string(),
            AppError::FormExpired => MSG_FORM_EXPIRED.to_string(),
            AppError::FormFull => MSG_FORM_FULL.to_string(),
            AppError::PasswordRequired => MSG_PASSWORD_REQUIRED.to_string(),
            AppError::PasswordInvalid => MSG_PASSWORD_INVALID.to_string(),
            AppError::DuplicateSubmission => MSG_SUBMISSION_DUPLICATE.to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::RateLimited { .. } => MSG_RATE_LIMITED.to_string(),
            AppError::RouteNotFound(route) => format!("Cannot {route}"),
            AppError::MethodNotAllowed => MSG_METHOD_NOT_ALLOWED.to_string(),
            AppError::Store(_) | AppError::TaskJoin(_) | AppError::PasswordHash(_) => {
                MSG_INTERNAL_ERROR.to_string()
            }
        }
    }
}

/// Body of every non-2xx response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub message: String,
    pub error: &'static str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Store(e) => tracing::error!("Store error: {:?}", e),
            AppError::TaskJoin(e) => tracing::error!("Task join error: {:?}", e),
            AppError::PasswordHash(e) => tracing::error!("Password hash error: {:?}", e),
            _ => {}
        }

        let status = self.status_code();
        let envelope = ErrorEnvelope {
            status_code: status.as_u16(),
            message: self.public_message(),
            error: self.code(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            path: None,
        };

        let mut response = (status, Json(envelope.clone())).into_response();

        if let AppError::RateLimited { retry_after_ms } = self {
            let secs = retry_after_ms.div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        // Picked up by `attach_request_path`
        response.extensions_mut().insert(envelope);
        response
    }
}

/// Fill in `path` on error envelopes produced anywhere below this layer
pub async fn attach_request_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let Some(envelope) = response.extensions().get::<ErrorEnvelope>().cloned() else {
        return response;
    };

    let (parts, _body) = response.into_parts();
    let envelope = ErrorEnvelope {
        path: Some(path),
        ..envelope
    };

    let mut rebuilt = (parts.status, Json(envelope)).into_response();
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_LENGTH && name != header::CONTENT_TYPE {
            rebuilt.headers_mut().append(name.clone(), value.clone());
        }
    }
    rebuilt
}

/// JSON body extractor whose rejection uses the error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
