// src/store/comments.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    error::AppError,
    models::comment::{Comment, CommentRow},
    models::post::LikeState,
};

const SELECT_COMMENT: &str = r#"
    SELECT
        c.id, c.post_id, c.author_id,
        u.name AS author_name, u.username AS author_username,
        c.parent_id, c.content, c.is_approved, c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

pub async fn insert(
    conn: &mut SqliteConnection,
    post_id: i64,
    author_id: i64,
    parent_id: Option<i64>,
    content: &str,
    now: DateTime<Utc>,
) -> Result<i64, AppError> {
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO comments (post_id, author_id, parent_id, content, is_approved, created_at, updated_at)
        VALUES (?, ?, ?, ?, 1, ?, ?)
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(author_id)
    .bind(parent_id)
    .bind(content)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Comment>, AppError> {
    let row = sqlx::query_as::<_, CommentRow>(&format!("{SELECT_COMMENT} WHERE c.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(hydrate(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Comments without a parent, newest first.
pub async fn top_level_for_post(
    conn: &mut SqliteConnection,
    post_id: i64,
) -> Result<Vec<Comment>, AppError> {
    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        "{SELECT_COMMENT} WHERE c.post_id = ? AND c.parent_id IS NULL
         ORDER BY c.created_at DESC, c.id DESC"
    ))
    .bind(post_id)
    .fetch_all(&mut *conn)
    .await?;
    hydrate(conn, rows).await
}

/// Every comment of a post in thread order.
pub async fn thread_for_post(
    conn: &mut SqliteConnection,
    post_id: i64,
) -> Result<Vec<Comment>, AppError> {
    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        "{SELECT_COMMENT} WHERE c.post_id = ? ORDER BY c.created_at ASC, c.id ASC"
    ))
    .bind(post_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(thread_order(hydrate(conn, rows).await?))
}

/// Deletes every comment attached to a post, replies included.
pub async fn delete_all_for_post(
    conn: &mut SqliteConnection,
    post_id: i64,
) -> Result<u64, AppError> {
    let deleted = sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(deleted)
}

pub async fn toggle_like(
    conn: &mut SqliteConnection,
    comment_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<LikeState, AppError> {
    let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = ? AND user_id = ?")
        .bind(comment_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if removed == 0 {
        sqlx::query(
            "INSERT OR IGNORE INTO comment_likes (comment_id, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(comment_id)
        .bind(user_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    let likes_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?")
            .bind(comment_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(LikeState {
        liked: removed == 0,
        likes_count,
    })
}

async fn hydrate(
    conn: &mut SqliteConnection,
    rows: Vec<CommentRow>,
) -> Result<Vec<Comment>, AppError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT comment_id, user_id FROM comment_likes WHERE comment_id IN (");
    let mut separated = builder.separated(", ");
    for row in &rows {
        separated.push_bind(row.id);
    }
    separated.push_unseparated(") ORDER BY comment_id, created_at, rowid");
    let pairs: Vec<(i64, i64)> = builder.build_query_as().fetch_all(&mut *conn).await?;

    let mut likes: HashMap<i64, Vec<i64>> = HashMap::new();
    for (comment_id, user_id) in pairs {
        likes.entry(comment_id).or_default().push(user_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            Comment::from_parts(row, likes.remove(&id).unwrap_or_default())
        })
        .collect())
}

/// Orders comments as a thread: roots newest first, each followed by its
/// replies (oldest first, depth first). Expects input sorted oldest first.
pub fn thread_order(comments: Vec<Comment>) -> Vec<Comment> {
    let mut roots = Vec::new();
    let mut children: HashMap<i64, Vec<Comment>> = HashMap::new();
    let known: std::collections::HashSet<i64> = comments.iter().map(|c| c.id).collect();

    for comment in comments {
        match comment.parent_id {
            Some(parent) if known.contains(&parent) => {
                children.entry(parent).or_default().push(comment)
            }
            _ => roots.push(comment),
        }
    }
    roots.reverse();

    let mut ordered = Vec::new();
    let mut stack: Vec<Comment> = roots.into_iter().rev().collect();
    while let Some(comment) = stack.pop() {
        if let Some(mut replies) = children.remove(&comment.id) {
            replies.reverse();
            stack.extend(replies);
        }
        ordered.push(comment);
    }
    ordered
}
