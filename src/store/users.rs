// src/store/users.rs
//
// Identity store: user records and credential lookup.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    error::AppError,
    models::user::{Role, User},
};

const SELECT_USER: &str = "SELECT id, name, username, email, password, role, bio, profile_picture, created_at, updated_at FROM users";

pub struct NewUser<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub bio: Option<&'a str>,
}

pub async fn insert(
    conn: &mut SqliteConnection,
    user: &NewUser<'_>,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, username, email, password, role, bio, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, name, username, email, password, role, bio, profile_picture, created_at, updated_at
        "#,
    )
    .bind(user.name)
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role)
    .bind(user.bio)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(user)
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

pub async fn find_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE email = ?"))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}
