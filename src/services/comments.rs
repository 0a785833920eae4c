// src/services/comments.rs

use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    db,
    error::AppError,
    models::{
        comment::{Comment, CreateCommentRequest},
        post::LikeState,
    },
    services::policy::{Action, Actor, Resource, authorize},
    store::{comments, posts},
    utils::html::clean_html,
};

/// Fails unless the post exists and the actor may read it.
async fn readable_post(
    conn: &mut sqlx::SqliteConnection,
    actor: &Actor,
    post_id: i64,
) -> Result<(), AppError> {
    let post = posts::find_row_by_id(conn, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    authorize(
        actor,
        Action::Read,
        &Resource::Post {
            author_id: post.author_id,
            status: post.status,
        },
    )
}

pub async fn create_comment(
    pool: &SqlitePool,
    actor: &Actor,
    post_id: i64,
    mut req: CreateCommentRequest,
) -> Result<Comment, AppError> {
    authorize(actor, Action::Create, &Resource::Comment)?;
    let user_id = actor.require_user()?;

    req.content = clean_html(req.content.trim());
    req.validate()?;

    let mut tx = db::begin_write(pool).await?;
    readable_post(&mut tx, actor, post_id).await?;

    if let Some(parent_id) = req.parent_id {
        let parent = comments::find_by_id(&mut tx, parent_id).await?;
        if parent.is_none_or(|p| p.post_id != post_id) {
            return Err(AppError::NotFound("Parent comment not found".to_string()));
        }
    }

    let id = comments::insert(&mut tx, post_id, user_id, req.parent_id, &req.content, Utc::now())
        .await?;
    let comment = comments::find_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
    tx.commit().await?;

    tracing::info!("Comment created: {} on post {} by user {}", id, post_id, user_id);
    Ok(comment)
}

pub async fn list_comments(
    pool: &SqlitePool,
    actor: &Actor,
    post_id: i64,
) -> Result<Vec<Comment>, AppError> {
    let mut conn = pool.acquire().await?;
    readable_post(&mut conn, actor, post_id).await?;
    comments::thread_for_post(&mut conn, post_id).await
}

pub async fn toggle_like(
    pool: &SqlitePool,
    actor: &Actor,
    comment_id: i64,
) -> Result<LikeState, AppError> {
    authorize(actor, Action::Like, &Resource::Comment)?;
    let user_id = actor.require_user()?;

    let mut tx = db::begin_write(pool).await?;
    let comment = comments::find_by_id(&mut tx, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
    readable_post(&mut tx, actor, comment.post_id).await?;
    let state = comments::toggle_like(&mut tx, comment_id, user_id, Utc::now()).await?;
    tx.commit().await?;

    tracing::info!(
        "Comment {} {} by user {}",
        comment_id,
        if state.liked { "liked" } else { "unliked" },
        user_id
    );
    Ok(state)
}
