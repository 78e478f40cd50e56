// src/handlers/auth.rs

use axum::{extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::admin::LoginRequest,
    store::admins,
    utils::{hash::verify_password, json::Json, jwt::sign_jwt},
};

/// Authenticates an admin and returns a JWT token.
///
/// Verifies the email and password against the `admins` table.
/// Unknown emails and wrong passwords get the same 401 response.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let admin = admins::find_by_email(&pool, payload.email.trim())
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::from(e)
        })?;

    let invalid = || AppError::AuthError("Invalid email or password".to_string());

    let admin = admin.ok_or_else(invalid)?;

    if !verify_password(&payload.password, &admin.password)? {
        tracing::warn!("Failed admin login for {}", admin.email);
        return Err(invalid());
    }

    let token = sign_jwt(
        &admin.email,
        &admin.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!("Admin {} logged in", admin.email);

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "email": admin.email,
    })))
}
