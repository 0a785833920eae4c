use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'tags' table: one ledger entry per distinct tag name.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// Number of live posts whose tag set contains `name`.
    pub post_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating a tag explicitly (admin).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 30, message = "Tag name must be between 1 and 30 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
}

/// DTO for renaming a tag and/or changing its description (admin).
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTagRequest {
    #[validate(length(min = 1, max = 30, message = "Tag name must be between 1 and 30 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagListParams {
    pub sort: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSort {
    #[default]
    PopularFirst,
    LeastPopularFirst,
    NameAsc,
    NameDesc,
    NewestFirst,
    OldestFirst,
}

impl TagSort {
    pub fn sql(&self) -> &'static str {
        match self {
            TagSort::PopularFirst => "post_count DESC, name ASC",
            TagSort::LeastPopularFirst => "post_count ASC, name ASC",
            TagSort::NameAsc => "name ASC",
            TagSort::NameDesc => "name DESC",
            TagSort::NewestFirst => "created_at DESC, id DESC",
            TagSort::OldestFirst => "created_at ASC, id ASC",
        }
    }
}

impl FromStr for TagSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "-postCount" => Ok(TagSort::PopularFirst),
            "postCount" => Ok(TagSort::LeastPopularFirst),
            "name" => Ok(TagSort::NameAsc),
            "-name" => Ok(TagSort::NameDesc),
            "-createdAt" => Ok(TagSort::NewestFirst),
            "createdAt" => Ok(TagSort::OldestFirst),
            other => Err(format!("Unsupported sort field '{}'", other)),
        }
    }
}
