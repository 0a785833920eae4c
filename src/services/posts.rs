// src/services/posts.rs
//
// Post lifecycle: multi-entity operations over the post store, the tag ledger
// and the comment store. Anything that changes a post's tag set runs in the
// same transaction as the ledger update.

use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    db,
    error::AppError,
    models::post::{
        CreatePostRequest, LikeState, Post, PostDetail, PostFilter, PostListParams, PostPage,
        PostSort, PostStats, PostStatus, UpdatePostRequest,
    },
    services::policy::{Action, Actor, Resource, authorize},
    store::{comments, posts, profiles, tags},
    utils::{
        html::clean_html,
        slug::{normalize_tag, normalize_tags, reading_time, slugify},
    },
};

pub const RELATED_LIMIT: i64 = 3;
pub const FEATURED_LIMIT: i64 = 6;
pub const RECOMMENDED_LIMIT: i64 = 10;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

fn post_resource(post: &Post) -> Resource {
    Resource::Post {
        author_id: post.author.id,
        status: post.status,
    }
}

/// Slug base for a title, rejecting titles with nothing sluggable in them.
fn title_slug(title: &str) -> Result<String, AppError> {
    let slug = slugify(title);
    if slug.trim_matches('-').is_empty() {
        return Err(AppError::validation(
            "Title must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

/// Trims, sanitizes and normalizes the payload, then validates it.
fn prepare_create(mut req: CreatePostRequest) -> Result<CreatePostRequest, AppError> {
    req.title = req.title.map(|t| t.trim().to_string());
    req.summary = req.summary.map(|s| s.trim().to_string());
    req.content = req.content.map(|c| clean_html(&c));
    req.tags = normalize_tags(&req.tags);
    req.validate()?;
    Ok(req)
}

fn prepare_update(mut req: UpdatePostRequest) -> Result<UpdatePostRequest, AppError> {
    req.title = req.title.map(|t| t.trim().to_string());
    req.summary = req.summary.map(|s| s.trim().to_string());
    req.content = req.content.map(|c| clean_html(&c));
    req.tags = req.tags.map(|t| normalize_tags(&t));
    req.validate()?;
    Ok(req)
}

async fn load(pool: &SqlitePool, id: i64) -> Result<Post, AppError> {
    let mut conn = pool.acquire().await?;
    posts::find_by_id(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

pub async fn create_post(
    pool: &SqlitePool,
    actor: &Actor,
    req: CreatePostRequest,
) -> Result<Post, AppError> {
    authorize(actor, Action::Create, &Resource::Posts)?;
    let author_id = actor.require_user()?;

    // Validation happens before any ledger mutation.
    let req = prepare_create(req)?;
    let title = req.title.unwrap_or_default();
    let content = req.content.unwrap_or_default();
    let summary = req.summary.unwrap_or_default();
    let base_slug = title_slug(&title)?;
    let status = req.status.unwrap_or_default();

    let now = Utc::now();
    let mut tx = db::begin_write(pool).await?;

    let slug = posts::unique_slug(&mut tx, &base_slug, None).await?;
    let id = posts::insert(
        &mut tx,
        &posts::NewPost {
            title: &title,
            slug: &slug,
            content: &content,
            summary: &summary,
            author_id,
            cover_image: req.cover_image.as_deref(),
            reading_time: reading_time(&content),
            status,
            featured: req.featured.unwrap_or(false),
            published_at: (status == PostStatus::Published).then_some(now),
        },
        now,
    )
    .await?;
    tags::attach(&mut tx, &req.tags, now).await?;
    posts::replace_tags(&mut tx, id, &req.tags).await?;

    tx.commit().await?;

    tracing::info!("Post created: {} by user {}", id, author_id);
    load(pool, id).await
}

pub async fn update_post(
    pool: &SqlitePool,
    actor: &Actor,
    id: i64,
    req: UpdatePostRequest,
) -> Result<Post, AppError> {
    let mut tx = db::begin_write(pool).await?;

    let existing = posts::find_row_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    authorize(
        actor,
        Action::Update,
        &Resource::Post {
            author_id: existing.author_id,
            status: existing.status,
        },
    )?;

    let req = prepare_update(req)?;
    let now = Utc::now();
    let mut changes = posts::PostChanges::default();

    if let Some(title) = req.title {
        let base = title_slug(&title)?;
        changes.slug = Some(posts::unique_slug(&mut tx, &base, Some(id)).await?);
        changes.title = Some(title);
    }
    if let Some(content) = req.content {
        changes.reading_time = Some(reading_time(&content));
        changes.content = Some(content);
    }
    if let Some(status) = req.status {
        if status == PostStatus::Published
            && existing.status != PostStatus::Published
            && existing.published_at.is_none()
        {
            changes.published_at = Some(now);
        }
        changes.status = Some(status);
    }
    changes.summary = req.summary;
    changes.cover_image = req.cover_image;
    changes.featured = req.featured;

    if let Some(new_tags) = req.tags {
        // Diff against the persisted set read inside this transaction.
        let old_tags = posts::tags_of(&mut tx, id).await?;
        let to_remove: Vec<String> = old_tags
            .iter()
            .filter(|t| !new_tags.contains(t))
            .cloned()
            .collect();
        let to_add: Vec<String> = new_tags
            .iter()
            .filter(|t| !old_tags.contains(t))
            .cloned()
            .collect();

        tags::detach(&mut tx, &to_remove, now).await?;
        tags::attach(&mut tx, &to_add, now).await?;
        posts::replace_tags(&mut tx, id, &new_tags).await?;
    }

    posts::apply_changes(&mut tx, id, changes, now).await?;
    tx.commit().await?;

    tracing::info!("Post updated: {} by user {:?}", id, actor.user_id());
    load(pool, id).await
}

/// Deletes the post, releases its tags and removes its comments as one unit.
pub async fn delete_post(pool: &SqlitePool, actor: &Actor, id: i64) -> Result<(), AppError> {
    let mut tx = db::begin_write(pool).await?;

    let existing = posts::find_row_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    authorize(
        actor,
        Action::Delete,
        &Resource::Post {
            author_id: existing.author_id,
            status: existing.status,
        },
    )?;

    let now = Utc::now();
    let post_tags = posts::tags_of(&mut tx, id).await?;
    let removed_comments = comments::delete_all_for_post(&mut tx, id).await?;
    tags::detach(&mut tx, &post_tags, now).await?;
    posts::delete(&mut tx, id).await?;

    // Dropping `tx` on any earlier `?` rolls all three steps back.
    tx.commit().await?;

    tracing::info!(
        "Post deleted: {} by user {:?} ({} comments removed)",
        id,
        actor.user_id(),
        removed_comments
    );
    Ok(())
}

/// Full post by slug with related posts and top-level comments. Counts a view.
pub async fn get_public_post(
    pool: &SqlitePool,
    actor: &Actor,
    slug: &str,
) -> Result<PostDetail, AppError> {
    let mut conn = pool.acquire().await?;

    let mut post = posts::find_by_slug(&mut conn, slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    authorize(actor, Action::Read, &post_resource(&post))?;

    match posts::increment_views(&mut conn, post.id).await {
        Ok(()) => post.views += 1,
        Err(e) => tracing::warn!("Failed to count view of post {}: {}", post.id, e),
    }

    let related_posts = posts::related(&mut conn, &post, RELATED_LIMIT).await?;
    let comments = comments::top_level_for_post(&mut conn, post.id).await?;

    Ok(PostDetail {
        post,
        related_posts,
        comments,
    })
}

/// Post by id under the same visibility rule as by slug. Does not count a view.
pub async fn get_post(pool: &SqlitePool, actor: &Actor, id: i64) -> Result<Post, AppError> {
    let post = load(pool, id).await?;
    authorize(actor, Action::Read, &post_resource(&post))?;
    Ok(post)
}

fn build_filter(
    params: &PostListParams,
    status: Option<PostStatus>,
) -> Result<(PostFilter, i64), AppError> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::validation("Page must be at least 1"));
    }
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if limit < 1 {
        return Err(AppError::validation("Limit must be at least 1"));
    }
    let limit = limit.min(MAX_PAGE_SIZE);

    let sort = match params.sort.as_deref() {
        Some(raw) => raw.parse::<PostSort>().map_err(AppError::validation)?,
        None => PostSort::default(),
    };

    let filter = PostFilter {
        status,
        author_id: params.author,
        tag: params
            .tag
            .as_deref()
            .map(normalize_tag)
            .filter(|t| !t.is_empty()),
        featured_only: params.featured.as_deref() == Some("true"),
        search: params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        sort,
        limit,
        offset: (page - 1) * limit,
    };
    Ok((filter, page))
}

fn requested_status(raw: Option<&str>) -> Result<Option<PostStatus>, AppError> {
    match raw {
        None | Some("all") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(AppError::validation),
    }
}

async fn page_of(pool: &SqlitePool, filter: PostFilter, page: i64) -> Result<PostPage, AppError> {
    let limit = filter.limit;
    let mut conn = pool.acquire().await?;
    let (posts, total) = posts::list(&mut conn, &filter).await?;

    Ok(PostPage {
        posts,
        total,
        current_page: page,
        total_pages: (total + limit - 1) / limit,
    })
}

/// Filtered, paginated listing. Only admins may see anything but published posts.
pub async fn list_posts(
    pool: &SqlitePool,
    actor: &Actor,
    params: &PostListParams,
) -> Result<PostPage, AppError> {
    let status = if actor.is_admin() {
        match params.status.as_deref() {
            None => Some(PostStatus::Published),
            other => requested_status(other)?,
        }
    } else {
        Some(PostStatus::Published)
    };

    let (filter, page) = build_filter(params, status)?;
    page_of(pool, filter, page).await
}

/// The caller's own posts in every status unless one is requested.
pub async fn list_own_posts(
    pool: &SqlitePool,
    actor: &Actor,
    params: &PostListParams,
) -> Result<PostPage, AppError> {
    let user_id = actor.require_user()?;
    let status = requested_status(params.status.as_deref())?;

    let (mut filter, page) = build_filter(params, status)?;
    filter.author_id = Some(user_id);
    page_of(pool, filter, page).await
}

pub async fn own_stats(pool: &SqlitePool, actor: &Actor) -> Result<PostStats, AppError> {
    let user_id = actor.require_user()?;
    let mut conn = pool.acquire().await?;
    posts::stats_for_author(&mut conn, user_id).await
}

pub async fn featured_posts(pool: &SqlitePool) -> Result<Vec<Post>, AppError> {
    let mut conn = pool.acquire().await?;
    posts::featured(&mut conn, FEATURED_LIMIT).await
}

/// Published posts matching the viewer's profile interests.
pub async fn recommended_posts(pool: &SqlitePool, actor: &Actor) -> Result<Vec<Post>, AppError> {
    let user_id = actor.require_user()?;
    let mut conn = pool.acquire().await?;

    let interests = profiles::interests(&mut conn, user_id).await?;
    posts::published_with_any_tag(&mut conn, &interests, None, RECOMMENDED_LIMIT).await
}

pub async fn toggle_like(
    pool: &SqlitePool,
    actor: &Actor,
    post_id: i64,
) -> Result<LikeState, AppError> {
    let user_id = actor.require_user()?;
    let mut tx = db::begin_write(pool).await?;

    let post = posts::find_row_by_id(&mut tx, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    authorize(
        actor,
        Action::Like,
        &Resource::Post {
            author_id: post.author_id,
            status: post.status,
        },
    )?;

    let state = posts::toggle_like(&mut tx, post_id, user_id, Utc::now()).await?;
    tx.commit().await?;

    if state.liked {
        tracing::info!("Post liked: {} by user {}", post_id, user_id);
    } else {
        tracing::info!("Post unliked: {} by user {}", post_id, user_id);
    }
    Ok(state)
}
