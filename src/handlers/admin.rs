// src/handlers/admin.rs

use axum::{
    extract::{Extension, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Duration;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::QuestionRequest,
        session::{CreateSessionRequest, CreateSessionResponse, QuizSession},
    },
    state::AppState,
    store::{
        attempts,
        questions::{self, DeleteOutcome, QuestionFields},
        sessions,
    },
    utils::{csv::results_csv, html::clean_html, json::Json, jwt::Claims},
};

/// Creates a new quiz session owned by the calling admin.
/// Admin only.
pub async fn create_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let hours = request
        .validity_hours
        .unwrap_or(state.config.session_validity_hours);

    let session = QuizSession::new(&claims.sub, state.clock.now(), Duration::hours(hours))?;
    sessions::insert_session(&state.pool, &session).await?;

    tracing::info!(
        "Session {} created by {} (expires {})",
        session.id,
        session.admin_email,
        session.expires_at
    );

    let response = CreateSessionResponse {
        quiz_link: state.config.quiz_link(&session.id),
        session_id: session.id,
        expires_at: session.expires_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Lists every session, newest first.
/// Admin only.
pub async fn list_sessions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let sessions = sessions::list_sessions(&state.pool).await?;
    Ok(Json(sessions))
}

/// Soft-deactivates a session; its link stops working but results are kept.
/// Admin only.
pub async fn deactivate_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !sessions::deactivate_session(&state.pool, &id).await? {
        return Err(AppError::NotFound("Session not found".to_string()));
    }

    tracing::info!("Session {} deactivated", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Completed attempts of a session.
/// Admin only.
pub async fn session_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    ensure_session_exists(&state, &id).await?;
    let results = attempts::completed_for_session(&state.pool, &id).await?;
    Ok(Json(results))
}

/// Same rows as `session_results`, as a CSV download.
/// Admin only.
pub async fn export_session_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    ensure_session_exists(&state, &id).await?;
    let results = attempts::completed_for_session(&state.pool, &id).await?;

    let disposition = format!("attachment; filename=\"quiz_results_{}.csv\"", id);
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (header::CONTENT_DISPOSITION, disposition),
    ];

    Ok((headers, results_csv(&results)))
}

async fn ensure_session_exists(state: &AppState, id: &str) -> Result<(), AppError> {
    sessions::find_session(&state.pool, id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
}

/// Lists all questions, correct options included.
/// Admin only.
pub async fn list_questions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let questions = questions::list_questions(&state.pool).await?;
    Ok(Json(questions))
}

/// Admin only.
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = questions::get_question(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
    Ok(Json(question))
}

/// Creates a new quiz question.
/// Admin only.
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = questions::create_question(&state.pool, &sanitized_fields(&payload)).await?;
    tracing::info!("Question {} created", question.id);

    Ok((StatusCode::CREATED, Json(question)))
}

/// Replaces a question's text, options and correct option.
/// Admin only.
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = questions::update_question(&state.pool, id, &sanitized_fields(&payload))
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Deletes a question by ID. The last remaining question cannot be deleted.
/// Admin only.
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    match questions::delete_question(&state.pool, id).await? {
        DeleteOutcome::Deleted => {
            tracing::info!("Question {} deleted", id);
            Ok(StatusCode::NO_CONTENT)
        }
        DeleteOutcome::NotFound => Err(AppError::NotFound("Question not found".to_string())),
        DeleteOutcome::LastQuestion => Err(AppError::BadRequest(
            "Cannot delete the last question. At least one question is required.".to_string(),
        )),
    }
}

fn sanitized_fields(payload: &QuestionRequest) -> QuestionFields {
    QuestionFields {
        prompt: clean_html(payload.prompt.trim()),
        option_a: clean_html(payload.option_a.trim()),
        option_b: clean_html(payload.option_b.trim()),
        option_c: clean_html(payload.option_c.trim()),
        option_d: clean_html(payload.option_d.trim()),
        correct_option: payload.normalized_correct_option(),
    }
}
