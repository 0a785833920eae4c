// src/store/posts.rs
//
// Post store. Every function runs on a caller-supplied connection so the
// lifecycle service can group several calls into one transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    error::AppError,
    models::post::{LikeState, Post, PostFilter, PostRow, PostStats, PostStatus},
};

const SELECT_POST: &str = r#"
    SELECT
        p.id, p.title, p.slug, p.content, p.summary, p.author_id,
        u.name AS author_name, u.username AS author_username,
        p.cover_image, p.reading_time, p.status, p.featured, p.views,
        p.created_at, p.updated_at, p.published_at
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

/// Fields of a post about to be inserted. Derived fields are already computed.
#[derive(Debug)]
pub struct NewPost<'a> {
    pub title: &'a str,
    pub slug: &'a str,
    pub content: &'a str,
    pub summary: &'a str,
    pub author_id: i64,
    pub cover_image: Option<&'a str>,
    pub reading_time: i64,
    pub status: PostStatus,
    pub featured: bool,
    pub published_at: Option<DateTime<Utc>>,
}

/// Column changes for an update. `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub reading_time: Option<i64>,
    pub summary: Option<String>,
    pub cover_image: Option<String>,
    pub status: Option<PostStatus>,
    pub featured: Option<bool>,
    pub published_at: Option<DateTime<Utc>>,
}

pub async fn insert(
    conn: &mut SqliteConnection,
    post: &NewPost<'_>,
    now: DateTime<Utc>,
) -> Result<i64, AppError> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO posts
            (title, slug, content, summary, author_id, cover_image, reading_time,
             status, featured, views, created_at, updated_at, published_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(post.title)
    .bind(post.slug)
    .bind(post.content)
    .bind(post.summary)
    .bind(post.author_id)
    .bind(post.cover_image)
    .bind(post.reading_time)
    .bind(post.status)
    .bind(post.featured)
    .bind(now)
    .bind(now)
    .bind(post.published_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Writes the given column changes and always bumps `updated_at`.
pub async fn apply_changes(
    conn: &mut SqliteConnection,
    id: i64,
    changes: PostChanges,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE posts SET ");
    let mut separated = builder.separated(", ");

    separated.push("updated_at = ");
    separated.push_bind_unseparated(now);

    if let Some(title) = changes.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }
    if let Some(slug) = changes.slug {
        separated.push("slug = ");
        separated.push_bind_unseparated(slug);
    }
    if let Some(content) = changes.content {
        separated.push("content = ");
        separated.push_bind_unseparated(content);
    }
    if let Some(reading_time) = changes.reading_time {
        separated.push("reading_time = ");
        separated.push_bind_unseparated(reading_time);
    }
    if let Some(summary) = changes.summary {
        separated.push("summary = ");
        separated.push_bind_unseparated(summary);
    }
    if let Some(cover_image) = changes.cover_image {
        separated.push("cover_image = ");
        separated.push_bind_unseparated(cover_image);
    }
    if let Some(status) = changes.status {
        separated.push("status = ");
        separated.push_bind_unseparated(status);
    }
    if let Some(featured) = changes.featured {
        separated.push("featured = ");
        separated.push_bind_unseparated(featured);
    }
    if let Some(published_at) = changes.published_at {
        separated.push("published_at = ");
        separated.push_bind_unseparated(published_at);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Post not found".to_string()));
    }
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Post not found".to_string()));
    }
    Ok(())
}

pub async fn find_row_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<PostRow>, AppError> {
    let row = sqlx::query_as::<_, PostRow>(&format!("{SELECT_POST} WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Post>, AppError> {
    match find_row_by_id(conn, id).await? {
        Some(row) => Ok(hydrate(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

pub async fn find_by_slug(
    conn: &mut SqliteConnection,
    slug: &str,
) -> Result<Option<Post>, AppError> {
    let row = sqlx::query_as::<_, PostRow>(&format!("{SELECT_POST} WHERE p.slug = ?"))
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(hydrate(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Returns `base` if free, otherwise the first of `base-2`, `base-3`, ... not
/// held by another post. `exclude_id` lets a post keep its own slug.
pub async fn unique_slug(
    conn: &mut SqliteConnection,
    base: &str,
    exclude_id: Option<i64>,
) -> Result<String, AppError> {
    let mut candidate = base.to_string();
    let mut suffix = 2;
    loop {
        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM posts WHERE slug = ?")
            .bind(&candidate)
            .fetch_optional(&mut *conn)
            .await?;

        match taken {
            Some(id) if Some(id) != exclude_id => {
                candidate = format!("{}-{}", base, suffix);
                suffix += 1;
            }
            _ => return Ok(candidate),
        }
    }
}

/// The persisted tag set of a post, in insertion order.
pub async fn tags_of(conn: &mut SqliteConnection, post_id: i64) -> Result<Vec<String>, AppError> {
    let tags = sqlx::query_scalar("SELECT tag_name FROM post_tags WHERE post_id = ? ORDER BY rowid")
        .bind(post_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(tags)
}

/// Replaces the tag set of a post. Tag counts are the ledger's concern.
pub async fn replace_tags(
    conn: &mut SqliteConnection,
    post_id: i64,
    tags: &[String],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    for tag in tags {
        sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_name) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Counter bump done in the store, never read-modify-write.
pub async fn increment_views(conn: &mut SqliteConnection, id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE posts SET views = views + 1 WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Removes `user_id` from the like set if present, otherwise adds it.
pub async fn toggle_like(
    conn: &mut SqliteConnection,
    post_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<LikeState, AppError> {
    let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if removed == 0 {
        sqlx::query(
            "INSERT OR IGNORE INTO post_likes (post_id, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    let likes_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(LikeState {
        liked: removed == 0,
        likes_count,
    })
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &PostFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        builder.push(" AND p.status = ");
        builder.push_bind(status);
    }
    if let Some(author_id) = filter.author_id {
        builder.push(" AND p.author_id = ");
        builder.push_bind(author_id);
    }
    if let Some(tag) = &filter.tag {
        builder.push(" AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_name = ");
        builder.push_bind(tag.clone());
        builder.push(")");
    }
    if filter.featured_only {
        builder.push(" AND p.featured = 1");
    }
    if let Some(search) = &filter.search {
        let pattern = search_pattern(search);
        builder.push(" AND (p.title REGEXP ");
        builder.push_bind(pattern.clone());
        builder.push(" OR p.content REGEXP ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

/// Case-insensitive literal match for `REGEXP`. Unlike `LIKE`, folds case
/// beyond ASCII.
fn search_pattern(search: &str) -> String {
    format!("(?i){}", regex::escape(search))
}

/// One filtered, sorted page plus the total number of matches.
pub async fn list(
    conn: &mut SqliteConnection,
    filter: &PostFilter,
) -> Result<(Vec<Post>, i64), AppError> {
    let mut count: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM posts p JOIN users u ON u.id = p.author_id");
    push_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut page: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_POST);
    push_filter(&mut page, filter);
    page.push(" ORDER BY ");
    page.push(filter.sort.sql());
    page.push(" LIMIT ");
    page.push_bind(filter.limit);
    page.push(" OFFSET ");
    page.push_bind(filter.offset);

    let rows: Vec<PostRow> = page.build_query_as().fetch_all(&mut *conn).await?;
    Ok((hydrate(conn, rows).await?, total))
}

/// Published posts carrying any of `tags`, newest publication first.
pub async fn published_with_any_tag(
    conn: &mut SqliteConnection,
    tags: &[String],
    exclude_id: Option<i64>,
    limit: i64,
) -> Result<Vec<Post>, AppError> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_POST);
    builder.push(" WHERE p.status = 'published'");
    if let Some(id) = exclude_id {
        builder.push(" AND p.id <> ");
        builder.push_bind(id);
    }
    builder.push(" AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_name IN (");
    let mut separated = builder.separated(", ");
    for tag in tags {
        separated.push_bind(tag.clone());
    }
    separated.push_unseparated("))");
    builder.push(" ORDER BY p.published_at DESC, p.id DESC LIMIT ");
    builder.push_bind(limit);

    let rows: Vec<PostRow> = builder.build_query_as().fetch_all(&mut *conn).await?;
    hydrate(conn, rows).await
}

/// Other published posts sharing at least one tag with `post`.
pub async fn related(
    conn: &mut SqliteConnection,
    post: &Post,
    limit: i64,
) -> Result<Vec<Post>, AppError> {
    published_with_any_tag(conn, &post.tags, Some(post.id), limit).await
}

pub async fn featured(conn: &mut SqliteConnection, limit: i64) -> Result<Vec<Post>, AppError> {
    let rows = sqlx::query_as::<_, PostRow>(&format!(
        "{SELECT_POST} WHERE p.status = 'published' AND p.featured = 1
         ORDER BY p.published_at DESC, p.id DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    hydrate(conn, rows).await
}

pub async fn published_by_author(
    conn: &mut SqliteConnection,
    author_id: i64,
    limit: i64,
) -> Result<Vec<Post>, AppError> {
    let rows = sqlx::query_as::<_, PostRow>(&format!(
        "{SELECT_POST} WHERE p.status = 'published' AND p.author_id = ?
         ORDER BY p.published_at DESC, p.id DESC LIMIT ?"
    ))
    .bind(author_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    hydrate(conn, rows).await
}

pub async fn stats_for_author(
    conn: &mut SqliteConnection,
    author_id: i64,
) -> Result<PostStats, AppError> {
    let stats = sqlx::query_as::<_, PostStats>(
        r#"
        SELECT
            COUNT(*) AS total_posts,
            COALESCE(SUM(CASE WHEN status = 'published' THEN 1 ELSE 0 END), 0) AS published,
            COALESCE(SUM(CASE WHEN status = 'draft' THEN 1 ELSE 0 END), 0) AS drafts,
            COALESCE(SUM(CASE WHEN status = 'archived' THEN 1 ELSE 0 END), 0) AS archived,
            COALESCE(SUM(views), 0) AS total_views,
            (SELECT COUNT(*) FROM post_likes pl JOIN posts lp ON lp.id = pl.post_id
             WHERE lp.author_id = ?) AS total_likes
        FROM posts
        WHERE author_id = ?
        "#,
    )
    .bind(author_id)
    .bind(author_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(stats)
}

/// Resolves tag sets and likes for a batch of rows with two queries.
pub async fn hydrate(
    conn: &mut SqliteConnection,
    rows: Vec<PostRow>,
) -> Result<Vec<Post>, AppError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT post_id, tag_name FROM post_tags WHERE post_id IN (");
    let mut separated = builder.separated(", ");
    for row in &rows {
        separated.push_bind(row.id);
    }
    separated.push_unseparated(") ORDER BY post_id, rowid");
    let pairs: Vec<(i64, String)> = builder.build_query_as().fetch_all(&mut *conn).await?;
    for (post_id, tag) in pairs {
        tags.entry(post_id).or_default().push(tag);
    }

    let mut likes: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT post_id, user_id FROM post_likes WHERE post_id IN (");
    let mut separated = builder.separated(", ");
    for row in &rows {
        separated.push_bind(row.id);
    }
    separated.push_unseparated(") ORDER BY post_id, created_at, rowid");
    let pairs: Vec<(i64, i64)> = builder.build_query_as().fetch_all(&mut *conn).await?;
    for (post_id, user_id) in pairs {
        likes.entry(post_id).or_default().push(user_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            Post::from_parts(
                row,
                tags.remove(&id).unwrap_or_default(),
                likes.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}
