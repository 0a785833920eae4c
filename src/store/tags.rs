// src/store/tags.rs
//
// Tag ledger: tag records and their denormalized `post_count`.
// Callers hold the transaction that also changes `post_tags`, so the count and
// the membership it summarizes always commit together.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    error::AppError,
    models::tag::{Tag, TagSort},
    utils::slug::slugify,
};

const SELECT_TAG: &str =
    "SELECT id, name, slug, description, post_count, created_at, updated_at FROM tags";

/// Fallback slug for names with no ASCII letters or digits (e.g. `日本`).
const FALLBACK_SLUG: &str = "tag";

/// Slug for a tag name, suffixed `-2`, `-3`, … until no other tag holds it.
/// Names that slugify to nothing use `FALLBACK_SLUG` as the base.
pub async fn unique_slug(
    conn: &mut SqliteConnection,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<String, AppError> {
    let slug = slugify(name);
    let base = match slug.trim_matches('-') {
        "" => FALLBACK_SLUG,
        trimmed => trimmed,
    };

    let mut candidate = base.to_string();
    let mut suffix = 2;
    loop {
        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM tags WHERE slug = ?")
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

/// Counts one more post for each name, creating missing tags with count 1.
pub async fn attach(
    conn: &mut SqliteConnection,
    names: &[String],
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    for name in names {
        let bumped = sqlx::query(
            "UPDATE tags SET post_count = post_count + 1, updated_at = ? WHERE name = ?",
        )
        .bind(now)
        .bind(name)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if bumped == 0 {
            let slug = unique_slug(conn, name, None).await?;
            sqlx::query(
                r#"
                INSERT INTO tags (name, slug, post_count, created_at, updated_at)
                VALUES (?, ?, 1, ?, ?)
                "#,
            )
            .bind(name)
            .bind(slug)
            .bind(now)
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

/// Counts one post fewer for each name. Counts never drop below zero; a
/// decrement that would is skipped and logged.
pub async fn detach(
    conn: &mut SqliteConnection,
    names: &[String],
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    for name in names {
        let updated = sqlx::query(
            "UPDATE tags SET post_count = post_count - 1, updated_at = ? WHERE name = ? AND post_count > 0",
        )
        .bind(now)
        .bind(name)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated == 0 {
            tracing::warn!("Tag '{}' post count already at zero or missing; decrement skipped", name);
        }
    }
    Ok(())
}

/// Renames a tag and every post reference to it.
///
/// Fails with `Conflict` if another tag already holds `new_name`.
pub async fn rename(
    conn: &mut SqliteConnection,
    tag: &Tag,
    new_name: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if find_by_name(conn, new_name).await?.is_some() {
        return Err(AppError::Conflict(format!("Tag '{}' already exists", new_name)));
    }

    sqlx::query("UPDATE post_tags SET tag_name = ? WHERE tag_name = ?")
        .bind(new_name)
        .bind(&tag.name)
        .execute(&mut *conn)
        .await?;

    let slug = unique_slug(conn, new_name, Some(tag.id)).await?;
    sqlx::query("UPDATE tags SET name = ?, slug = ?, updated_at = ? WHERE id = ?")
        .bind(new_name)
        .bind(slug)
        .bind(now)
        .bind(tag.id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Creates a tag that no post references yet.
pub async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Tag, AppError> {
    let slug = unique_slug(conn, name, None).await?;
    let tag = sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (name, slug, description, post_count, created_at, updated_at)
        VALUES (?, ?, ?, 0, ?, ?)
        RETURNING id, name, slug, description, post_count, created_at, updated_at
        "#,
    )
    .bind(name)
    .bind(slug)
    .bind(description)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("Tag already exists".to_string()),
        other => other,
    })?;
    Ok(tag)
}

pub async fn set_description(
    conn: &mut SqliteConnection,
    id: i64,
    description: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE tags SET description = ?, updated_at = ? WHERE id = ?")
        .bind(description)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Removes the tag from every post, then deletes the record.
pub async fn delete(conn: &mut SqliteConnection, tag: &Tag) -> Result<u64, AppError> {
    let detached = sqlx::query("DELETE FROM post_tags WHERE tag_name = ?")
        .bind(&tag.name)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(tag.id)
        .execute(&mut *conn)
        .await?;

    Ok(detached)
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Tag>, AppError> {
    let tag = sqlx::query_as::<_, Tag>(&format!("{SELECT_TAG} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(tag)
}

pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<Tag>, AppError> {
    let tag = sqlx::query_as::<_, Tag>(&format!("{SELECT_TAG} WHERE name = ?"))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(tag)
}

pub async fn find_by_slug(conn: &mut SqliteConnection, slug: &str) -> Result<Option<Tag>, AppError> {
    let tag = sqlx::query_as::<_, Tag>(&format!("{SELECT_TAG} WHERE slug = ?"))
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(tag)
}

pub async fn list(
    conn: &mut SqliteConnection,
    sort: TagSort,
    limit: i64,
) -> Result<Vec<Tag>, AppError> {
    let tags = sqlx::query_as::<_, Tag>(&format!("{SELECT_TAG} ORDER BY {} LIMIT ?", sort.sql()))
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
    Ok(tags)
}

/// Tags ordered by `post_count` descending.
pub async fn list_by_popularity(
    conn: &mut SqliteConnection,
    limit: i64,
) -> Result<Vec<Tag>, AppError> {
    list(conn, TagSort::PopularFirst, limit).await
}
