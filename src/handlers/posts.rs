// src/handlers/posts.rs

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
    extract::{AppJson, AppQuery},
    models::post::{CreatePostRequest, PostListParams, PostPage, UpdatePostRequest},
    services::{policy::Actor, posts},
    utils::jwt::Claims,
};

fn actor(claims: Option<Extension<Claims>>) -> Result<Actor, AppError> {
    Actor::from_claims(claims.as_ref().map(|Extension(c)| c))
}

fn page_body(page: PostPage) -> serde_json::Value {
    json!({
        "success": true,
        "count": page.posts.len(),
        "total": page.total,
        "pagination": {
            "currentPage": page.current_page,
            "totalPages": page.total_pages,
        },
        "data": page.posts,
    })
}

/// Create a new post.
/// Requires: Login.
pub async fn create_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    let post = posts::create_post(&pool, &actor, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": post })),
    ))
}

/// List posts with filters and pagination.
/// Anonymous and regular users only ever see published posts.
pub async fn list_posts(
    State(pool): State<SqlitePool>,
    claims: Option<Extension<Claims>>,
    AppQuery(params): AppQuery<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(claims)?;
    let page = posts::list_posts(&pool, &actor, &params).await?;
    Ok(Json(page_body(page)))
}

pub async fn featured_posts(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let posts = posts::featured_posts(&pool).await?;
    Ok(Json(json!({ "success": true, "count": posts.len(), "data": posts })))
}

/// Published posts tagged with the caller's profile interests.
pub async fn recommended_posts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    let posts = posts::recommended_posts(&pool, &actor).await?;
    Ok(Json(json!({ "success": true, "count": posts.len(), "data": posts })))
}

/// Get a post by slug. Counts a view and attaches related posts and comments.
pub async fn get_post_by_slug(
    State(pool): State<SqlitePool>,
    claims: Option<Extension<Claims>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(claims)?;
    let detail = posts::get_public_post(&pool, &actor, &slug).await?;

    Ok(Json(json!({
        "success": true,
        "data": detail.post,
        "relatedPosts": detail.related_posts,
        "comments": detail.comments,
    })))
}

pub async fn get_post_by_id(
    State(pool): State<SqlitePool>,
    claims: Option<Extension<Claims>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor(claims)?;
    let post = posts::get_post(&pool, &actor, id).await?;
    Ok(Json(json!({ "success": true, "data": post })))
}

/// The caller's own posts, drafts included.
pub async fn list_my_posts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppQuery(params): AppQuery<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    let page = posts::list_own_posts(&pool, &actor, &params).await?;
    Ok(Json(page_body(page)))
}

pub async fn my_stats(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    let stats = posts::own_stats(&pool, &actor).await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

/// Update a post. Only the author or an admin may do this.
pub async fn update_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    let post = posts::update_post(&pool, &actor, id, payload).await?;
    Ok(Json(json!({ "success": true, "data": post })))
}

/// Delete a post together with its comments and tag counts.
pub async fn delete_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    posts::delete_post(&pool, &actor, id).await?;
    Ok(Json(json!({ "success": true, "message": "Post deleted successfully" })))
}

/// Toggle the caller's like on a post.
pub async fn toggle_like(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::from_claims(Some(&claims))?;
    let state = posts::toggle_like(&pool, &actor, id).await?;
    Ok(Json(json!({
        "success": true,
        "liked": state.liked,
        "likesCount": state.likes_count,
    })))
}
