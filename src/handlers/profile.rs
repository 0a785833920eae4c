// src/handlers/profile.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    extract::AppJson,
    models::profile::ProfileRequest,
    store::{
        posts,
        profiles::{self, ProfileFields},
        users,
    },
    utils::{jwt::Claims, slug::normalize_tags},
};

const RECENT_POSTS_LIMIT: i64 = 5;

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get the current user's profile.
pub async fn get_my_profile(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let mut conn = pool.acquire().await?;

    let profile = profiles::find_by_user(&mut conn, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("There is no profile for this user".to_string()))?;
    let user = users::find_by_id(&mut conn, user_id).await?;

    Ok(Json(json!({ "success": true, "data": profile, "user": user })))
}

/// Create or replace the current user's profile.
///
/// Interests are normalized like tag names so recommendations can match them.
pub async fn upsert_profile(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppJson(mut payload): AppJson<ProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    payload.bio = payload.bio.trim().to_string();
    payload.website = trimmed(payload.website);
    payload.validate()?;

    let fields = ProfileFields {
        bio: payload.bio,
        occupation: trimmed(payload.occupation),
        company: trimmed(payload.company),
        website: payload.website,
        location: trimmed(payload.location),
        skills: payload
            .skills
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        interests: normalize_tags(&payload.interests),
        social: payload.social,
    };

    let mut conn = pool.acquire().await?;
    let profile = profiles::upsert(&mut conn, user_id, fields, Utc::now()).await?;

    tracing::info!("Profile saved for user {}", user_id);
    Ok(Json(json!({ "success": true, "data": profile })))
}

/// Public profile of any user with their most recent published posts.
pub async fn get_user_profile(
    State(pool): State<SqlitePool>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;

    let user = users::find_by_id(&mut conn, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let profile = profiles::find_by_user(&mut conn, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    let recent_posts = posts::published_by_author(&mut conn, user_id, RECENT_POSTS_LIMIT).await?;

    Ok(Json(json!({
        "success": true,
        "data": profile,
        "user": user,
        "recentPosts": recent_posts,
    })))
}
