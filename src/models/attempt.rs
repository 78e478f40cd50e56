// src/models/attempt.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use super::question::PublicQuestion;

/// Question id -> chosen option label. Partial until the attempt is completed.
pub type Answers = BTreeMap<i64, String>;

/// Represents the 'quiz_attempts' table in the database.
/// One row per (session, requester identity).
#[derive(Debug, Clone, FromRow)]
pub struct Attempt {
    pub id: String,
    pub session_id: String,
    /// Network-address-derived requester key; unique within a session.
    pub identity: String,
    pub student_name: String,
    pub student_email: String,
    pub student_school: String,
    pub email_verified: bool,
    /// Identity provider subject when the email was verified.
    pub verified_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<i64>,
    pub total_questions: Option<i64>,
    /// Last autosaved or finally submitted snapshot.
    pub answers: Option<Json<Answers>>,
    pub is_completed: bool,
}

impl Attempt {
    /// The stored snapshot, or an empty one if nothing was saved yet.
    pub fn saved_answers(&self) -> Answers {
        self.answers
            .as_ref()
            .map(|json| json.0.clone())
            .unwrap_or_default()
    }
}

/// Student details captured when an attempt starts.
#[derive(Debug, Clone)]
pub struct StudentInfo {
    pub name: String,
    pub email: String,
    pub school: String,
    pub email_verified: bool,
    pub verified_id: Option<String>,
}

/// DTO for starting an attempt.
/// `credential` is the identity provider token, required only when verification is on.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptRequest {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 254))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub school: String,
    pub credential: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub attempt_id: String,
    pub started_at: DateTime<Utc>,
}

/// DTO for both autosave and final submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswersRequest {
    pub attempt_id: String,
    #[serde(default)]
    pub answers: Answers,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnswersResponse {
    pub saved: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub score: i64,
    pub total_questions: i64,
    pub completed: bool,
    pub attempt_id: String,
    /// Certificate file name, absent when the issuer failed.
    pub certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// What a student sees when opening a session link.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuizStateView {
    NotStarted(QuizPaper),
    InProgress(ResumeState),
    Completed(CompletedState),
    TimeExpired(TimeExpiredState),
}

/// Fresh question set before any attempt exists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPaper {
    pub session_id: String,
    pub questions: Vec<PublicQuestion>,
    pub time_limit_ms: i64,
    pub started: bool,
    pub already_completed: bool,
}

/// Enough to resume an attempt exactly where it was left.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeState {
    pub session_id: String,
    pub attempt_id: String,
    pub questions: Vec<PublicQuestion>,
    pub time_limit_ms: i64,
    pub remaining_ms: i64,
    pub started_at: DateTime<Utc>,
    pub saved_answers: Answers,
    pub started: bool,
    pub already_completed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedState {
    pub already_completed: bool,
    pub attempt_id: String,
    pub score: i64,
    pub total_questions: Option<i64>,
}

/// Returned by the read that auto-submits an attempt whose time ran out.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeExpiredState {
    pub time_expired: bool,
    pub already_completed: bool,
    pub attempt_id: String,
    pub score: i64,
    pub total_questions: Option<i64>,
}

/// A completed attempt as listed in the admin results and CSV export.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub attempt_id: String,
    pub student_name: String,
    pub student_email: String,
    pub student_school: String,
    pub email_verified: bool,
    pub identity: String,
    pub score: i64,
    pub total_questions: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl AttemptResult {
    pub fn duration_seconds(&self) -> i64 {
        (self.completed_at - self.started_at).num_seconds().max(0)
    }
}
