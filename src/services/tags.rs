// src/services/tags.rs

use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    db,
    error::AppError,
    models::{
        post::Post,
        tag::{CreateTagRequest, Tag, TagListParams, TagSort, UpdateTagRequest},
    },
    services::policy::{Action, Actor, Resource, authorize},
    store::{posts, tags},
    utils::slug::normalize_tag,
};

pub const DEFAULT_TAG_LIMIT: i64 = 20;
pub const DEFAULT_POPULAR_LIMIT: i64 = 10;
pub const TAG_POSTS_LIMIT: i64 = 10;

fn bounded_limit(limit: Option<i64>, default: i64) -> Result<i64, AppError> {
    match limit {
        None => Ok(default),
        Some(l) if l < 1 => Err(AppError::validation("Limit must be at least 1")),
        Some(l) => Ok(l.min(100)),
    }
}

pub async fn list_tags(pool: &SqlitePool, params: &TagListParams) -> Result<Vec<Tag>, AppError> {
    let sort = match params.sort.as_deref() {
        Some(raw) => raw.parse::<TagSort>().map_err(AppError::validation)?,
        None => TagSort::default(),
    };
    let limit = bounded_limit(params.limit, DEFAULT_TAG_LIMIT)?;

    let mut conn = pool.acquire().await?;
    tags::list(&mut conn, sort, limit).await
}

pub async fn popular_tags(pool: &SqlitePool, limit: Option<i64>) -> Result<Vec<Tag>, AppError> {
    let limit = bounded_limit(limit, DEFAULT_POPULAR_LIMIT)?;
    let mut conn = pool.acquire().await?;
    tags::list_by_popularity(&mut conn, limit).await
}

/// A tag and its newest published posts.
pub async fn tag_with_posts(pool: &SqlitePool, slug: &str) -> Result<(Tag, Vec<Post>), AppError> {
    let mut conn = pool.acquire().await?;
    let tag = tags::find_by_slug(&mut conn, slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    let posts = posts::published_with_any_tag(
        &mut conn,
        std::slice::from_ref(&tag.name),
        None,
        TAG_POSTS_LIMIT,
    )
    .await?;
    Ok((tag, posts))
}

pub async fn create_tag(
    pool: &SqlitePool,
    actor: &Actor,
    mut req: CreateTagRequest,
) -> Result<Tag, AppError> {
    authorize(actor, Action::Create, &Resource::Tag)?;

    req.name = normalize_tag(&req.name);
    req.validate()?;

    let mut tx = db::begin_write(pool).await?;
    if tags::find_by_name(&mut tx, &req.name).await?.is_some() {
        return Err(AppError::Conflict("Tag already exists".to_string()));
    }
    let tag = tags::insert(&mut tx, &req.name, req.description.as_deref(), Utc::now()).await?;
    tx.commit().await?;

    tracing::info!("Tag created: {} by user {:?}", tag.name, actor.user_id());
    Ok(tag)
}

/// Renames (propagating to every post) and/or re-describes a tag.
///
/// The rename and the post rewrites share one transaction, so posts tagged
/// concurrently with the old name either commit first and get renamed, or
/// commit after and re-create the old tag through the ledger upsert.
pub async fn update_tag(
    pool: &SqlitePool,
    actor: &Actor,
    id: i64,
    mut req: UpdateTagRequest,
) -> Result<Tag, AppError> {
    authorize(actor, Action::Update, &Resource::Tag)?;

    req.name = req.name.map(|n| normalize_tag(&n));
    req.validate()?;

    let now = Utc::now();
    let mut tx = db::begin_write(pool).await?;
    let tag = tags::find_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    if let Some(new_name) = req.name.as_deref().filter(|n| *n != tag.name) {
        tags::rename(&mut tx, &tag, new_name, now).await?;
        tracing::info!("Tag renamed: '{}' -> '{}'", tag.name, new_name);
    }
    if let Some(description) = req.description.as_deref() {
        tags::set_description(&mut tx, id, description, now).await?;
    }

    let updated = tags::find_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;
    tx.commit().await?;

    tracing::info!("Tag updated: {} by user {:?}", id, actor.user_id());
    Ok(updated)
}

/// Removes the tag from every post and deletes the record.
pub async fn delete_tag(pool: &SqlitePool, actor: &Actor, id: i64) -> Result<(), AppError> {
    authorize(actor, Action::Delete, &Resource::Tag)?;

    let mut tx = db::begin_write(pool).await?;
    let tag = tags::find_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;
    let detached = tags::delete(&mut tx, &tag).await?;
    tx.commit().await?;

    tracing::info!(
        "Tag deleted: {} by user {:?} (removed from {} posts)",
        tag.name,
        actor.user_id(),
        detached
    );
    Ok(())
}
