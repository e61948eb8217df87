use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    error::CoreError,
    models::announcement::{Announcement, CreateAnnouncementRequest},
    services::announcements::AnnouncementService,
    AppState,
};

/// GET /api/announcements: what the display should show right now.
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<Announcement>>, (StatusCode, Json<Value>)> {
    AnnouncementService::list_active(&state.backend, Utc::now())
        .await
        .map(Json)
        .map_err(CoreError::into_http)
}

/// POST /api/announcements
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    AnnouncementService::create(&state.backend, body)
        .await
        .map(|a| (StatusCode::CREATED, Json(json!({ "status": "ok", "id": a.id }))))
        .map_err(CoreError::into_http)
}
