use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::{
    error::CoreError,
    models::asset::{Asset, AssetQuery, UploadOutcome},
    services::assets::AssetService,
    AppState,
};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 500;

/// GET /api/assets?limit=N
pub async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<AssetQuery>,
) -> Result<Json<Vec<Asset>>, (StatusCode, Json<Value>)> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(0, MAX_LIMIT) as usize;
    AssetService::list(&state.backend, &state.config.upload_dir, limit)
        .await
        .map(Json)
        .map_err(CoreError::into_http)
}

/// POST /api/upload, multipart field `file`.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadOutcome>), (StatusCode, Json<Value>)> {
    AssetService::upload(&state.backend, &state.config.upload_dir, multipart)
        .await
        .map(|outcome| (StatusCode::CREATED, Json(outcome)))
        .map_err(CoreError::into_http)
}
