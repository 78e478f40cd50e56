// src/store/sessions.rs

use sqlx::SqlitePool;

use crate::models::session::QuizSession;

pub async fn insert_session(pool: &SqlitePool, session: &QuizSession) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO quiz_sessions (id, created_at, expires_at, is_active, admin_email)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.created_at)
    .bind(session.expires_at)
    .bind(session.is_active)
    .bind(&session.admin_email)
    .execute(pool)
    .await?;

    Ok(())
}

/// Looks a session up by id, including inactive and expired ones.
pub async fn find_session(pool: &SqlitePool, id: &str) -> Result<Option<QuizSession>, sqlx::Error> {
    sqlx::query_as::<_, QuizSession>(
        r#"
        SELECT id, created_at, expires_at, is_active, admin_email
        FROM quiz_sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// All sessions, newest first.
pub async fn list_sessions(pool: &SqlitePool) -> Result<Vec<QuizSession>, sqlx::Error> {
    sqlx::query_as::<_, QuizSession>(
        r#"
        SELECT id, created_at, expires_at, is_active, admin_email
        FROM quiz_sessions
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Clears the active flag. Returns false if the session does not exist.
pub async fn deactivate_session(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE quiz_sessions SET is_active = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
