// tests/tag_tests.rs

mod common;

use common::{post_body, spawn_app};
use serde_json::{Value, json};

async fn tag_id(app: &common::TestApp, name: &str) -> i64 {
    sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn tag_management_is_admin_only() {
    let app = spawn_app().await;
    let user = app.register().await;

    app.create_post(&user, post_body("Testing Matters", &["testing"], "published")).await;
    let id = tag_id(&app, "testing").await;
    let url = app.url(&format!("/api/tags/{}", id));

    let response = app.client.put(&url).json(&json!({ "name": "qa" })).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .put(&url)
        .bearer_auth(&user.token)
        .json(&json!({ "name": "qa" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .client
        .post(app.url("/api/tags"))
        .bearer_auth(&user.token)
        .json(&json!({ "name": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = app.client.delete(&url).bearer_auth(&user.token).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 403);
    assert_eq!(app.tag_count("testing").await, Some(1));
}

#[tokio::test]
async fn rename_propagates_to_posts() {
    let app = spawn_app().await;
    let user = app.register().await;
    let admin = app.admin().await;

    let post = app
        .create_post(&user, post_body("Testing Matters", &["testing", "rust"], "published"))
        .await;
    app.create_post(&user, post_body("More Testing", &["testing"], "published")).await;
    let id = tag_id(&app, "testing").await;

    let response = app
        .client
        .put(app.url(&format!("/api/tags/{}", id)))
        .bearer_auth(&admin.token)
        .json(&json!({ "name": "Quality Assurance", "description": "Making sure it works" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["name"], "quality assurance");
    assert_eq!(body["data"]["slug"], "quality-assurance");
    assert_eq!(body["data"]["postCount"], 2);
    assert_eq!(body["data"]["description"], "Making sure it works");

    assert_eq!(app.tag_count("testing").await, None);

    let body: Value = app
        .client
        .get(app.url(&format!("/api/posts/id/{}", post["id"])))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["tags"], json!(["quality assurance", "rust"]));

    let body: Value = app
        .client
        .get(app.url("/api/tags/quality-assurance"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);

    // Renaming onto an existing tag is refused.
    let response = app
        .client
        .put(app.url(&format!("/api/tags/{}", id)))
        .bearer_auth(&admin.token)
        .json(&json!({ "name": "rust" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn create_list_and_delete_tags() {
    let app = spawn_app().await;
    let user = app.register().await;
    let admin = app.admin().await;

    let response = app
        .client
        .post(app.url("/api/tags"))
        .bearer_auth(&admin.token)
        .json(&json!({ "name": " Databases ", "description": "Storage engines" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["data"]["name"], "databases");
    assert_eq!(created["data"]["postCount"], 0);

    let response = app
        .client
        .post(app.url("/api/tags"))
        .bearer_auth(&admin.token)
        .json(&json!({ "name": "DATABASES" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    let post = app
        .create_post(&user, post_body("Picking a Database", &["databases", "rust"], "published"))
        .await;
    app.create_post(&user, post_body("Rust Again", &["rust"], "published")).await;

    let body: Value = app
        .client
        .get(app.url("/api/tags/popular?limit=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "rust");

    let body: Value = app
        .client
        .get(app.url("/api/tags?sort=name"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["name"], "databases");

    let response = app.client.get(app.url("/api/tags?sort=bogus")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .client
        .delete(app.url(&format!("/api/tags/{}", created["data"]["id"])))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = app
        .client
        .get(app.url(&format!("/api/posts/id/{}", post["id"])))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["tags"], json!(["rust"]));

    let response = app.client.get(app.url("/api/tags/databases")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

async fn tag_slug(app: &common::TestApp, name: &str) -> String {
    sqlx::query_scalar("SELECT slug FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn tags_with_colliding_slugs_get_suffixed_slugs() {
    let app = spawn_app().await;
    let user = app.register().await;
    let admin = app.admin().await;

    app.create_post(&user, post_body("Systems Languages", &["c++", "c#"], "published")).await;
    assert_eq!(app.tag_count("c++").await, Some(1));
    assert_eq!(app.tag_count("c#").await, Some(1));
    assert_eq!(tag_slug(&app, "c++").await, "c");
    assert_eq!(tag_slug(&app, "c#").await, "c-2");

    app.create_post(&user, post_body("More Sharp", &["c#"], "published")).await;
    assert_eq!(app.tag_count("c#").await, Some(2));
    assert_eq!(tag_slug(&app, "c#").await, "c-2");

    // Names with no ASCII word characters still get a non-empty slug.
    app.create_post(&user, post_body("Languages of Asia", &["日本", "中文"], "published")).await;
    assert_eq!(tag_slug(&app, "日本").await, "tag");
    assert_eq!(tag_slug(&app, "中文").await, "tag-2");

    let body: Value = app
        .client
        .get(app.url("/api/tags/c-2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["name"], "c#");
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);

    // Admin-created tags and renames pick a free slug as well.
    let response = app
        .client
        .post(app.url("/api/tags"))
        .bearer_auth(&admin.token)
        .json(&json!({ "name": "C" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["data"]["slug"], "c-3");

    let id = tag_id(&app, "c++").await;
    let response = app
        .client
        .put(app.url(&format!("/api/tags/{}", id)))
        .bearer_auth(&admin.token)
        .json(&json!({ "name": "c plus plus" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(tag_slug(&app, "c plus plus").await, "c-plus-plus");

    let response = app
        .client
        .put(app.url(&format!("/api/tags/{}", tag_id(&app, "c#").await)))
        .bearer_auth(&admin.token)
        .json(&json!({ "name": "c sharp" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(tag_slug(&app, "c sharp").await, "c-sharp");
}
