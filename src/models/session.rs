// src/models/session.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// Represents the 'quiz_sessions' table in the database.
/// A session is a time-boxed quiz link created by an admin.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub admin_email: String,
}

impl QuizSession {
    /// Builds a fresh session valid for `validity` from `now`.
    pub fn new(admin_email: &str, now: DateTime<Utc>, validity: Duration) -> Result<Self, AppError> {
        if validity <= Duration::zero() {
            return Err(AppError::BadRequest(
                "Session validity must be positive".to_string(),
            ));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            expires_at: now + validity,
            is_active: true,
            admin_email: admin_email.to_owned(),
        })
    }

    /// True while the validity window is still open.
    /// This is the only place expiry is decided.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// DTO for an admin creating a session. Validity defaults to the configured hours.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[validate(range(min = 1, max = 720))]
    pub validity_hours: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub quiz_link: String,
    pub expires_at: DateTime<Utc>,
}
