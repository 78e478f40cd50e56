// src/store/attempts.rs

use chrono::{DateTime, Utc};
use sqlx::{SqlitePool, types::Json};

use crate::models::attempt::{Answers, Attempt, AttemptResult, StudentInfo};

const ATTEMPT_COLUMNS: &str = r#"
    id, session_id, identity, student_name, student_email, student_school,
    email_verified, verified_id, started_at, completed_at, score, total_questions,
    answers, is_completed
"#;

/// Outcome of trying to create an attempt.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(Attempt),
    /// Another request already holds the (session, identity) slot.
    AlreadyExists,
}

/// Final values written when an attempt completes.
#[derive(Debug, Clone)]
pub struct Completion<'a> {
    pub completed_at: DateTime<Utc>,
    pub score: i64,
    pub total_questions: i64,
    pub answers: &'a Answers,
}

pub async fn find_by_identity(
    pool: &SqlitePool,
    session_id: &str,
    identity: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    let sql = format!(
        "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE session_id = ? AND identity = ?"
    );
    sqlx::query_as::<_, Attempt>(&sql)
        .bind(session_id)
        .bind(identity)
        .fetch_optional(pool)
        .await
}

/// Finds attempt `attempt_id` only if it belongs to `session_id`.
pub async fn find_in_session(
    pool: &SqlitePool,
    session_id: &str,
    attempt_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = ? AND session_id = ?");
    sqlx::query_as::<_, Attempt>(&sql)
        .bind(attempt_id)
        .bind(session_id)
        .fetch_optional(pool)
        .await
}

/// Inserts a new in-progress attempt.
///
/// The UNIQUE(session_id, identity) constraint decides concurrent starts; the
/// loser gets `AlreadyExists` instead of an error.
pub async fn insert_attempt(
    pool: &SqlitePool,
    session_id: &str,
    identity: &str,
    student: &StudentInfo,
    started_at: DateTime<Utc>,
) -> Result<InsertOutcome, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let sql = format!(
        r#"
        INSERT INTO quiz_attempts
            (id, session_id, identity, student_name, student_email, student_school,
             email_verified, verified_id, started_at, is_completed)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
        RETURNING {ATTEMPT_COLUMNS}
        "#
    );

    let inserted = sqlx::query_as::<_, Attempt>(&sql)
        .bind(&id)
        .bind(session_id)
        .bind(identity)
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.school)
        .bind(student.email_verified)
        .bind(&student.verified_id)
        .bind(started_at)
        .fetch_one(pool)
        .await;

    match inserted {
        Ok(attempt) => Ok(InsertOutcome::Created(attempt)),
        Err(e) if super::is_unique_violation(&e) => Ok(InsertOutcome::AlreadyExists),
        Err(e) => Err(e),
    }
}

/// Overwrites the answer snapshot of an in-progress attempt.
/// Returns false if no such in-progress attempt exists in the session.
pub async fn save_answers(
    pool: &SqlitePool,
    session_id: &str,
    attempt_id: &str,
    answers: &Answers,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE quiz_attempts
        SET answers = ?
        WHERE id = ? AND session_id = ? AND is_completed = 0
        "#,
    )
    .bind(Json(answers))
    .bind(attempt_id)
    .bind(session_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Moves an attempt to Completed.
///
/// The update only matches rows that are still in progress, so exactly one
/// caller wins the transition. Returns whether this call was the one.
pub async fn finalize_attempt(
    pool: &SqlitePool,
    session_id: &str,
    attempt_id: &str,
    completion: &Completion<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE quiz_attempts
        SET completed_at = ?, score = ?, total_questions = ?, answers = ?, is_completed = 1
        WHERE id = ? AND session_id = ? AND is_completed = 0
        "#,
    )
    .bind(completion.completed_at)
    .bind(completion.score)
    .bind(completion.total_questions)
    .bind(Json(completion.answers))
    .bind(attempt_id)
    .bind(session_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Completed attempts of a session, in completion order.
pub async fn completed_for_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Vec<AttemptResult>, sqlx::Error> {
    sqlx::query_as::<_, AttemptResult>(
        r#"
        SELECT
            id AS attempt_id,
            student_name,
            student_email,
            student_school,
            email_verified,
            identity,
            COALESCE(score, 0) AS score,
            COALESCE(total_questions, 0) AS total_questions,
            started_at,
            completed_at
        FROM quiz_attempts
        WHERE session_id = ? AND is_completed = 1 AND completed_at IS NOT NULL
        ORDER BY completed_at
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await
}
