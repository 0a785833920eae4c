// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    error::expose_internal_details,
    handlers::{auth, comments, health, posts, profile, tags},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, optional_auth_middleware},
};

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, posts, comments, tags, profile).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool and config).
pub fn create_router(state: AppState) -> Router {
    expose_internal_details(!state.config.is_production());

    let require_auth = || middleware::from_fn_with_state(state.clone(), auth_middleware);
    let optional_auth = || middleware::from_fn_with_state(state.clone(), optional_auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route_layer(require_auth()),
        );

    // `/{id}` carries a slug on GET and a numeric id on PUT/DELETE.
    let post_routes = Router::new()
        .route("/", get(posts::list_posts))
        .route("/featured", get(posts::featured_posts))
        .route("/id/{id}", get(posts::get_post_by_id))
        .route("/{id}", get(posts::get_post_by_slug))
        .route("/{id}/comments", get(comments::list_comments))
        .route_layer(optional_auth())
        .merge(
            Router::new()
                .route("/", post(posts::create_post))
                .route("/recommended", get(posts::recommended_posts))
                .route("/me", get(posts::list_my_posts))
                .route("/me/stats", get(posts::my_stats))
                .route("/{id}", put(posts::update_post).delete(posts::delete_post))
                .route("/{id}/like", put(posts::toggle_like))
                .route("/{id}/comments", post(comments::create_comment))
                .route_layer(require_auth()),
        );

    let comment_routes = Router::new()
        .route("/{id}/like", put(comments::toggle_like))
        .route_layer(require_auth());

    // Same shape as posts: slug on GET, id on PUT/DELETE.
    let tag_routes = Router::new()
        .route("/", get(tags::list_tags))
        .route("/popular", get(tags::popular_tags))
        .route("/{id}", get(tags::get_tag))
        .merge(
            Router::new()
                .route("/", post(tags::create_tag))
                .route("/{id}", put(tags::update_tag).delete(tags::delete_tag))
                // Auth first, then the admin check
                .route_layer(middleware::from_fn(admin_middleware))
                .route_layer(require_auth()),
        );

    let profile_routes = Router::new()
        .route("/user/{user_id}", get(profile::get_user_profile))
        .merge(
            Router::new()
                .route("/", put(profile::upsert_profile))
                .route("/me", get(profile::get_my_profile))
                .route_layer(require_auth()),
        );

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/posts", post_routes)
        .nest("/api/comments", comment_routes)
        .nest("/api/tags", tag_routes)
        .nest("/api/profile", profile_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config)),
        )
        .with_state(state)
}
