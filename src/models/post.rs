use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

use crate::models::user::AuthorSummary;

/// Publication state. Every transition is allowed; `published_at` is only
/// stamped on the first entry into `Published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            other => Err(format!("Unknown status '{}'", other)),
        }
    }
}

/// Row shape of `posts` joined with its author.
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub summary: String,
    pub author_id: i64,
    pub author_name: String,
    pub author_username: String,
    pub cover_image: Option<String>,
    pub reading_time: i64,
    pub status: PostStatus,
    pub featured: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A post with its tag set and likes resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub summary: String,
    pub author: AuthorSummary,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    pub reading_time: i64,
    pub status: PostStatus,
    pub featured: bool,
    /// User ids.
    pub likes: Vec<i64>,
    pub likes_count: usize,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn from_parts(row: PostRow, tags: Vec<String>, likes: Vec<i64>) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            summary: row.summary,
            author: AuthorSummary {
                id: row.author_id,
                name: row.author_name,
                username: row.author_username,
            },
            tags,
            cover_image: row.cover_image,
            reading_time: row.reading_time,
            status: row.status,
            featured: row.featured,
            likes_count: likes.len(),
            likes,
            views: row.views,
            created_at: row.created_at,
            updated_at: row.updated_at,
            published_at: row.published_at,
        }
    }
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(
        required(message = "Title is required"),
        length(min = 5, max = 150, message = "Title must be between 5 and 150 characters")
    )]
    pub title: Option<String>,

    #[validate(
        required(message = "Content is required"),
        length(min = 100, message = "Content must be at least 100 characters long")
    )]
    pub content: Option<String>,

    #[validate(
        required(message = "Summary is required"),
        length(min = 1, max = 300, message = "Summary must be between 1 and 300 characters")
    )]
    pub summary: Option<String>,

    #[serde(default)]
    #[validate(custom(function = validate_tags))]
    pub tags: Vec<String>,

    #[validate(custom(function = validate_cover_image))]
    pub cover_image: Option<String>,

    pub status: Option<PostStatus>,
    pub featured: Option<bool>,
}

/// DTO for a partial update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[validate(length(min = 5, max = 150, message = "Title must be between 5 and 150 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 100, message = "Content must be at least 100 characters long"))]
    pub content: Option<String>,

    #[validate(length(min = 1, max = 300, message = "Summary must be between 1 and 300 characters"))]
    pub summary: Option<String>,

    #[validate(custom(function = validate_tags))]
    pub tags: Option<Vec<String>>,

    #[validate(custom(function = validate_cover_image))]
    pub cover_image: Option<String>,

    pub status: Option<PostStatus>,
    pub featured: Option<bool>,
}

/// Tags arrive already normalized; only the length bound is checked here.
fn validate_tags(tags: &[String]) -> Result<(), validator::ValidationError> {
    if tags
        .iter()
        .any(|t| t.chars().count() > crate::utils::slug::MAX_TAG_LEN)
    {
        return Err(validator::ValidationError::new("tag_too_long")
            .with_message("Tag name cannot exceed 30 characters".into()));
    }
    Ok(())
}

fn validate_cover_image(url: &str) -> Result<(), validator::ValidationError> {
    if url.len() > 500 || Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url")
            .with_message("Cover image must be a valid URL".into()));
    }
    Ok(())
}

/// Sortable post fields, as accepted in `?sort=` (prefix `-` for descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSortField {
    CreatedAt,
    UpdatedAt,
    PublishedAt,
    Views,
    Title,
    ReadingTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostSort {
    pub field: PostSortField,
    pub descending: bool,
}

impl Default for PostSort {
    fn default() -> Self {
        Self {
            field: PostSortField::CreatedAt,
            descending: true,
        }
    }
}

impl PostSort {
    /// ORDER BY clause body. Columns are fixed strings, never user input.
    pub fn sql(&self) -> &'static str {
        use PostSortField::*;
        match (self.field, self.descending) {
            (CreatedAt, true) => "p.created_at DESC, p.id DESC",
            (CreatedAt, false) => "p.created_at ASC, p.id ASC",
            (UpdatedAt, true) => "p.updated_at DESC, p.id DESC",
            (UpdatedAt, false) => "p.updated_at ASC, p.id ASC",
            (PublishedAt, true) => "p.published_at DESC, p.id DESC",
            (PublishedAt, false) => "p.published_at ASC, p.id ASC",
            (Views, true) => "p.views DESC, p.id DESC",
            (Views, false) => "p.views ASC, p.id ASC",
            (Title, true) => "p.title DESC, p.id DESC",
            (Title, false) => "p.title ASC, p.id ASC",
            (ReadingTime, true) => "p.reading_time DESC, p.id DESC",
            (ReadingTime, false) => "p.reading_time ASC, p.id ASC",
        }
    }
}

impl FromStr for PostSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.trim().strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.trim()),
        };
        let field = match name {
            "createdAt" => PostSortField::CreatedAt,
            "updatedAt" => PostSortField::UpdatedAt,
            "publishedAt" => PostSortField::PublishedAt,
            "views" => PostSortField::Views,
            "title" => PostSortField::Title,
            "readingTime" => PostSortField::ReadingTime,
            other => return Err(format!("Unsupported sort field '{}'", other)),
        };
        Ok(Self { field, descending })
    }
}

/// Query parameters for listing posts.
#[derive(Debug, Default, Deserialize)]
pub struct PostListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub author: Option<i64>,
    pub tag: Option<String>,
    pub status: Option<String>,
    pub featured: Option<String>,
    pub search: Option<String>,
}

/// Resolved filter handed to the post store.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub author_id: Option<i64>,
    pub tag: Option<String>,
    pub featured_only: bool,
    pub search: Option<String>,
    pub sort: PostSort,
    pub limit: i64,
    pub offset: i64,
}

/// One page of posts plus the totals the client paginates with.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: i64,
    pub current_page: i64,
    pub total_pages: i64,
}

/// Full post view returned by slug lookup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub post: Post,
    pub related_posts: Vec<Post>,
    pub comments: Vec<crate::models::comment::Comment>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: i64,
}

/// Per-author aggregate for the dashboard.
#[derive(Debug, Default, Serialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostStats {
    pub total_posts: i64,
    pub published: i64,
    pub drafts: i64,
    pub archived: i64,
    pub total_views: i64,
    pub total_likes: i64,
}
