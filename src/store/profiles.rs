// src/store/profiles.rs

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, types::Json};

use crate::{
    error::AppError,
    models::profile::{Profile, SocialLinks},
};

const SELECT_PROFILE: &str = "SELECT user_id, bio, occupation, company, website, location, skills, interests, social, created_at, updated_at FROM profiles";

/// Normalized profile fields ready to be written.
pub struct ProfileFields {
    pub bio: String,
    pub occupation: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub social: SocialLinks,
}

pub async fn find_by_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<Profile>, AppError> {
    let profile = sqlx::query_as::<_, Profile>(&format!("{SELECT_PROFILE} WHERE user_id = ?"))
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(profile)
}

/// Creates the profile or replaces every field of the existing one.
pub async fn upsert(
    conn: &mut SqliteConnection,
    user_id: i64,
    fields: ProfileFields,
    now: DateTime<Utc>,
) -> Result<Profile, AppError> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles
            (user_id, bio, occupation, company, website, location, skills, interests, social, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            bio = excluded.bio,
            occupation = excluded.occupation,
            company = excluded.company,
            website = excluded.website,
            location = excluded.location,
            skills = excluded.skills,
            interests = excluded.interests,
            social = excluded.social,
            updated_at = excluded.updated_at
        RETURNING user_id, bio, occupation, company, website, location, skills, interests, social, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(fields.bio)
    .bind(fields.occupation)
    .bind(fields.company)
    .bind(fields.website)
    .bind(fields.location)
    .bind(Json(fields.skills))
    .bind(Json(fields.interests))
    .bind(Json(fields.social))
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(profile)
}

/// Interest tags of a user; empty when the user has no profile.
pub async fn interests(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<String>, AppError> {
    let interests: Option<Json<Vec<String>>> =
        sqlx::query_scalar("SELECT interests FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(interests.map(|Json(list)| list).unwrap_or_default())
}
