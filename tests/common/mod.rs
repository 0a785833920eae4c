// tests/common/mod.rs
#![allow(dead_code)]

use blog_api::{
    config::Config,
    db,
    models::user::Role,
    routes,
    state::AppState,
    store::users::{self, NewUser},
    utils::{hash::hash_password, jwt::sign_jwt},
};
use chrono::Utc;
use serde_json::{Value, json};
use sqlx::SqlitePool;

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub config: Config,
    pub client: reqwest::Client,
}

/// A registered user and the token issued for them.
pub struct TestUser {
    pub id: i64,
    pub token: String,
}

/// Spawns the app on a random port backed by its own in-memory database.
pub async fn spawn_app() -> TestApp {
    let config = Config::for_tests();
    let pool = db::connect(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to open in-memory database");

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        config,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self) -> TestUser {
        let suffix = &uuid::Uuid::new_v4().to_string()[..8];
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "name": format!("User {}", suffix),
                "username": format!("u_{}", suffix),
                "email": format!("{}@example.com", suffix),
                "password": PASSWORD,
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        TestUser {
            id: body["user"]["id"].as_i64().unwrap(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Inserts an admin straight into the store and signs a token for it.
    pub async fn admin(&self) -> TestUser {
        let suffix = &uuid::Uuid::new_v4().to_string()[..8];
        let email = format!("admin_{}@example.com", suffix);
        let username = format!("admin_{}", suffix);
        let hashed = hash_password(PASSWORD).unwrap();

        let mut conn = self.pool.acquire().await.unwrap();
        let user = users::insert(
            &mut conn,
            &NewUser {
                name: "Admin",
                username: &username,
                email: &email,
                password_hash: &hashed,
                role: Role::Admin,
                bio: None,
            },
            Utc::now(),
        )
        .await
        .unwrap();
        drop(conn);

        let token = sign_jwt(
            user.id,
            Role::Admin,
            &self.config.jwt_secret,
            self.config.jwt_expiration,
        )
        .unwrap();
        TestUser { id: user.id, token }
    }

    pub async fn create_post(&self, user: &TestUser, body: Value) -> Value {
        let response = self
            .client
            .post(self.url("/api/posts"))
            .bearer_auth(&user.token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        body["data"].clone()
    }

    /// `post_count` of a tag, `None` if the tag does not exist.
    pub async fn tag_count(&self, name: &str) -> Option<i64> {
        sqlx::query_scalar("SELECT post_count FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .unwrap()
    }
}

/// Long enough to pass the content length rule; about 30 words.
pub fn body_text() -> String {
    "Testing gives confidence that the code behaves the way we expect it to. \
     Small focused tests are easy to read, fast to run and simple to maintain \
     over the lifetime of a project."
        .to_string()
}

pub fn post_body(title: &str, tags: &[&str], status: &str) -> Value {
    json!({
        "title": title,
        "content": body_text(),
        "summary": "A short summary",
        "tags": tags,
        "status": status,
    })
}
