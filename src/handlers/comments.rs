// src/handlers/comments.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    extract::AppJson,
    models::comment::CreateCommentRequest,
    services::{comments, policy::Actor},
    utils::jwt::Claims,
};

/// Add a comment (or a reply, with `parentId`) to a readable post.
pub async fn create_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    let comment = comments::create_comment(&pool, &actor, post_id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": comment })),
    ))
}

/// Full comment thread of a post, replies following their parent.
pub async fn list_comments(
    State(pool): State<SqlitePool>,
    claims: Option<Extension<Claims>>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(claims.as_ref().map(|Extension(c)| c))?;
    let thread = comments::list_comments(&pool, &actor, post_id).await?;
    Ok(Json(json!({ "success": true, "count": thread.len(), "data": thread })))
}

pub async fn toggle_like(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    let state = comments::toggle_like(&pool, &actor, id).await?;
    Ok(Json(json!({
        "success": true,
        "liked": state.liked,
        "likesCount": state.likes_count,
    })))
}
