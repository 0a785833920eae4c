// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    extract::AppJson,
    models::user::{AuthResponse, LoginRequest, RegisterRequest, Role},
    store::users::{self, NewUser},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with the user (excluding password) and a token.
pub async fn register(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AppJson(mut payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();
    payload.username = payload.username.trim().to_string();
    payload.validate()?;

    let mut conn = pool.acquire().await?;

    if users::find_by_email(&mut conn, &payload.email).await?.is_some() {
        tracing::warn!("Registration failed: email already exists - {}", payload.email);
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = users::insert(
        &mut conn,
        &NewUser {
            name: &payload.name,
            username: &payload.username,
            email: &payload.email,
            password_hash: &hashed_password,
            role: Role::User,
            bio: payload.bio.as_deref(),
        },
        Utc::now(),
    )
    .await
    .map_err(|e| match e {
        AppError::Conflict(_) => {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        }
        other => other,
    })?;

    let token = sign_jwt(user.id, user.role, &config.jwt_secret, config.jwt_expiration)?;
    tracing::info!("New user registered: {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user,
            token,
        }),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown email and wrong password produce the same 401.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let email = payload.email.trim().to_lowercase();

    let mut conn = pool.acquire().await?;
    let user = users::find_by_email(&mut conn, &email).await?;

    let Some(user) = user else {
        tracing::warn!("Login failed: unknown email {}", email);
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    };

    if !verify_password(&payload.password, &user.password)? {
        tracing::warn!("Login failed: invalid password for user {}", user.id);
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(user.id, user.role, &config.jwt_secret, config.jwt_expiration)?;
    tracing::info!("User logged in: {}", user.id);

    Ok(Json(AuthResponse {
        success: true,
        user,
        token,
    }))
}

/// Returns the authenticated user.
pub async fn me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let user = users::find_by_id(&mut conn, claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::AuthError("User not found".to_string()))?;

    Ok(Json(json!({ "success": true, "data": user })))
}
