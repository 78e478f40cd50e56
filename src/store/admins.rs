// src/store/admins.rs

use sqlx::SqlitePool;

use crate::models::admin::Admin;

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Admin>, sqlx::Error> {
    sqlx::query_as::<_, Admin>(
        r#"
        SELECT id, email, password, role
        FROM admins
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Inserts an admin unless the email is already taken. Returns true if a row was added.
pub async fn insert_admin_if_missing(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO admins (email, password, role)
        VALUES (?, ?, 'admin')
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
