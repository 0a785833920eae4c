// tests/tag_ledger_tests.rs
//
// Drives the post service with random create/update/delete sequences and
// checks after every step that each tag's post_count equals the number of
// posts actually carrying it, including under concurrent writers on a file
// database.

use blog_api::{
    db,
    error::AppError,
    models::{
        post::{CreatePostRequest, PostStatus, UpdatePostRequest},
        user::Role,
    },
    services::{policy::Actor, posts},
    store::users::{self, NewUser},
};
use chrono::Utc;
use rand::{Rng, SeedableRng, rngs::StdRng};
use sqlx::SqlitePool;

const VOCABULARY: [&str; 6] = ["rust", "Rust ", "js", "testing", "sql", "async"];

async fn setup() -> (SqlitePool, Actor) {
    setup_with("sqlite::memory:", 1).await
}

async fn setup_with(database_url: &str, max_connections: u32) -> (SqlitePool, Actor) {
    let pool = db::connect(database_url, max_connections).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let user = users::insert(
        &mut conn,
        &NewUser {
            name: "Ledger",
            username: "ledger",
            email: "ledger@example.com",
            password_hash: "not-a-real-hash",
            role: Role::User,
            bio: None,
        },
        Utc::now(),
    )
    .await
    .unwrap();
    drop(conn);

    (
        pool,
        Actor::User {
            id: user.id,
            role: Role::User,
        },
    )
}

fn random_tags(rng: &mut StdRng) -> Vec<String> {
    let n = rng.random_range(0..4);
    (0..n)
        .map(|_| VOCABULARY[rng.random_range(0..VOCABULARY.len())].to_string())
        .collect()
}

fn create_request(title: String, tags: Vec<String>) -> CreatePostRequest {
    CreatePostRequest {
        title: Some(title),
        content: Some("word ".repeat(60)),
        summary: Some("summary".to_string()),
        tags,
        cover_image: None,
        status: Some(PostStatus::Published),
        featured: None,
    }
}

async fn assert_ledger_consistent(pool: &SqlitePool, step: usize) {
    let mismatches: Vec<(String, i64, i64)> = sqlx::query_as(
        r#"
        SELECT t.name, t.post_count, COUNT(pt.post_id)
        FROM tags t
        LEFT JOIN post_tags pt ON pt.tag_name = t.name
        GROUP BY t.id
        HAVING t.post_count <> COUNT(pt.post_id)
        "#,
    )
    .fetch_all(pool)
    .await
    .unwrap();
    assert!(mismatches.is_empty(), "step {}: {:?}", step, mismatches);

    let untracked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM post_tags pt WHERE NOT EXISTS (SELECT 1 FROM tags t WHERE t.name = pt.tag_name)",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(untracked, 0, "step {}: post tags without a ledger entry", step);
}

#[tokio::test]
async fn post_count_matches_membership_under_random_operations() {
    for seed in [7_u64, 42, 1234] {
        let (pool, actor) = setup().await;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut live: Vec<i64> = Vec::new();

        for step in 0..60 {
            match rng.random_range(0..3) {
                0 => {
                    let req = create_request(format!("Post number {}", step), random_tags(&mut rng));
                    let post = posts::create_post(&pool, &actor, req).await.unwrap();
                    live.push(post.id);
                }
                1 if !live.is_empty() => {
                    let id = live[rng.random_range(0..live.len())];
                    let req = UpdatePostRequest {
                        tags: Some(random_tags(&mut rng)),
                        ..Default::default()
                    };
                    posts::update_post(&pool, &actor, id, req).await.unwrap();
                }
                2 if !live.is_empty() => {
                    let id = live.swap_remove(rng.random_range(0..live.len()));
                    posts::delete_post(&pool, &actor, id).await.unwrap();
                }
                _ => {}
            }
            assert_ledger_consistent(&pool, step).await;
        }
    }
}

#[tokio::test]
async fn rejected_writes_leave_the_ledger_untouched() {
    let (pool, actor) = setup().await;

    let post = posts::create_post(
        &pool,
        &actor,
        create_request("A valid post".to_string(), vec!["rust".to_string()]),
    )
    .await
    .unwrap();

    // Too-long tag fails validation after normalization.
    let err = posts::update_post(
        &pool,
        &actor,
        post.id,
        UpdatePostRequest {
            tags: Some(vec!["sql".to_string(), "x".repeat(31)]),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let stranger = Actor::User { id: post.author.id + 100, role: Role::User };
    let err = posts::update_post(
        &pool,
        &stranger,
        post.id,
        UpdatePostRequest {
            tags: Some(vec!["sql".to_string()]),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = posts::delete_post(&pool, &stranger, post.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let counts: Vec<(String, i64)> = sqlx::query_as("SELECT name, post_count FROM tags ORDER BY name")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(counts, vec![("rust".to_string(), 1)]);
    assert_ledger_consistent(&pool, 0).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_on_a_file_database() {
    let path = std::env::temp_dir().join(format!("blog-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let (pool, actor) = setup_with(&url, 5).await;

    let handles: Vec<_> = (0..20)
        .map(|n| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let tags = vec!["rust".to_string(), VOCABULARY[n % VOCABULARY.len()].to_string()];
                posts::create_post(&pool, &actor, create_request(format!("Concurrent post {}", n), tags))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 20);
    assert_eq!(
        sqlx::query_scalar::<_, i64>("SELECT post_count FROM tags WHERE name = 'rust'")
            .fetch_one(&pool)
            .await
            .unwrap(),
        20
    );
    assert_ledger_consistent(&pool, 0).await;

    pool.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}
