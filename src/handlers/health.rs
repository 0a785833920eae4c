// src/handlers/health.rs

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use crate::{error::AppError, state::AppState};

/// Liveness check. Touches the database so a dead pool shows up as a 500.
pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(Json(json!({
        "success": true,
        "status": "ok",
        "environment": state.config.environment.as_str(),
        "timestamp": Utc::now(),
    })))
}
