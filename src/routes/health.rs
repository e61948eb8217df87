use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{db::Backend, AppState};

pub async fn index() -> Json<Value> {
    Json(json!({ "message": "Masjid Display Backend Running" }))
}

/// Reports which backend is in use and whether it is reachable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let dirs = json!({
        "data_dir": state.config.data_dir.display().to_string(),
        "upload_dir": state.config.upload_dir.display().to_string(),
    });
    match &state.backend {
        Backend::Fallback(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "mode": "fallback", "db": "not configured", "storage": dirs })),
        ),
        Backend::Database(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({ "status": "ok", "mode": "database", "db": "connected", "storage": dirs })),
            ),
            Err(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "mode": "database", "db": e.to_string(), "storage": dirs })),
            ),
        },
    }
}
