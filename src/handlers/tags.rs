// src/handlers/tags.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    extract::{AppJson, AppQuery},
    models::tag::{CreateTagRequest, TagListParams, UpdateTagRequest},
    services::{policy::Actor, tags},
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    pub limit: Option<i64>,
}

pub async fn list_tags(
    State(pool): State<SqlitePool>,
    AppQuery(params): AppQuery<TagListParams>,
) -> Result<impl IntoResponse, AppError> {
    let tags = tags::list_tags(&pool, &params).await?;
    Ok(Json(json!({ "success": true, "count": tags.len(), "data": tags })))
}

pub async fn popular_tags(
    State(pool): State<SqlitePool>,
    AppQuery(params): AppQuery<PopularParams>,
) -> Result<impl IntoResponse, AppError> {
    let tags = tags::popular_tags(&pool, params.limit).await?;
    Ok(Json(json!({ "success": true, "data": tags })))
}

/// A tag with its newest published posts.
pub async fn get_tag(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (tag, posts) = tags::tag_with_posts(&pool, &slug).await?;
    Ok(Json(json!({ "success": true, "data": tag, "posts": posts })))
}

// --- Admin ---

pub async fn create_tag(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    let tag = tags::create_tag(&pool, &actor, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": tag })),
    ))
}

/// Rename a tag everywhere it is used and/or change its description.
pub async fn update_tag(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    let tag = tags::update_tag(&pool, &actor, id, payload).await?;
    Ok(Json(json!({ "success": true, "data": tag })))
}

pub async fn delete_tag(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    tags::delete_tag(&pool, &actor, id).await?;
    Ok(Json(json!({ "success": true, "message": "Tag deleted successfully" })))
}
