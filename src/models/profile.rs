// src/models/profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use url::Url;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
}

/// Represents the 'profiles' table. One per user.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: i64,
    pub bio: String,
    pub occupation: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub skills: Json<Vec<String>>,
    /// Normalized like tag names so they can be matched against post tags.
    pub interests: Json<Vec<String>>,
    pub social: Json<SocialLinks>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating or replacing the caller's profile.
#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 1, max = 500, message = "Bio must be between 1 and 500 characters"))]
    pub bio: String,
    #[validate(length(max = 100))]
    pub occupation: Option<String>,
    #[validate(length(max = 100))]
    pub company: Option<String>,
    #[validate(custom(function = validate_website))]
    pub website: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub social: SocialLinks,
}

fn validate_website(website: &str) -> Result<(), validator::ValidationError> {
    let candidate = if website.contains("://") {
        website.to_string()
    } else {
        format!("https://{}", website)
    };
    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some_and(|h| h.contains('.')) => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_url")
            .with_message("Please provide a valid URL".into())),
    }
}
