use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{AppJson, Result};
use crate::models::{
    ClientMeta, PublicForm, SubmitRequest, SubmitResponse, ValidatePasswordRequest,
    ValidatePasswordResponse,
};
use crate::AppState;

/// Public projection of a form
///
/// GET /f/:id
pub async fn get_public_form(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    client: ClientMeta,
) -> Result<Json<PublicForm>> {
    let form = state.service.get_public_form(&form_id, &client).await?;
    Ok(Json(form))
}

/// Check a form password without submitting
///
/// POST /f/:id/validate-password
pub async fn validate_password(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    AppJson(payload): AppJson<ValidatePasswordRequest>,
) -> Result<Json<ValidatePasswordResponse>> {
    let valid = state
        .service
        .validate_password(&form_id, &payload.password)
        .await?;
    Ok(Json(ValidatePasswordResponse { valid }))
}

/// Submit answers
///
/// POST /f/:id/submit
pub async fn submit_response(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    client: ClientMeta,
    AppJson(payload): AppJson<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    let response = state
        .service
        .submit_response(&form_id, payload, &client)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}
