// src/handlers/quiz.rs

use axum::{
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    error::AppError,
    models::attempt::{AnswersRequest, StartAttemptRequest},
    services::{certificate::PdfCertificateIssuer, quiz_service::QuizService},
    state::AppState,
    utils::{client_ip::ClientIdentity, json::Json},
};

/// Returns the quiz state for this session and requester.
///
/// * No attempt yet: the question set (without answers) and the time limit.
/// * Attempt in progress: questions, remaining time and the saved answers.
/// * Attempt completed: the score only.
/// * Time ran out since the last read: the attempt is auto-submitted first.
pub async fn get_quiz_state(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ClientIdentity(identity): ClientIdentity,
) -> Result<impl IntoResponse, AppError> {
    let view = QuizService::from_state(&state)
        .get_quiz_state(&session_id, &identity)
        .await?;

    Ok(Json(view))
}

/// Starts (or resumes) the requester's attempt.
/// Returns the same attempt id and start time on every call for the same requester.
pub async fn start_attempt(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ClientIdentity(identity): ClientIdentity,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let started = QuizService::from_state(&state)
        .start_attempt(&session_id, &identity, payload)
        .await?;

    Ok(Json(started))
}

/// Autosaves the in-progress answers. The snapshot is replaced, not merged.
pub async fn save_answers(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<AnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let saved = QuizService::from_state(&state)
        .save_answers(&session_id, &payload.attempt_id, &payload.answers)
        .await?;

    Ok(Json(saved))
}

/// Submits the final answers, scores them and issues a certificate if possible.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<AnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = QuizService::from_state(&state)
        .submit_attempt(&session_id, &payload.attempt_id, &payload.answers)
        .await?;

    Ok(Json(result))
}

/// Downloads the PDF certificate of a completed attempt.
pub async fn download_certificate(
    State(state): State<AppState>,
    Path(attempt_id): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state
        .issuer
        .load(&attempt_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Certificate not found".to_string()))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        PdfCertificateIssuer::file_name(&attempt_id)
    );

    let mut response = Response::new(bytes.into());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?,
    );

    Ok(response)
}

/// Settings the quiz page needs before it renders the start form.
pub async fn public_config(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.config;
    Json(json!({
        "oauthEnabled": config.verification.required,
        "googleClientId": config.google_client_id,
        "allowedEmailDomains": config.verification.allowed_domains,
        "timeLimitMs": config.quiz_time_limit_secs * 1000,
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
