// src/state.rs

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::config::Config;

/// Shared by every handler. Handlers extract only the part they need
/// (`State<SqlitePool>` or `State<Config>`) through the derived `FromRef`.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
}
