use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::Local;
use serde_json::Value;

use crate::{
    error::CoreError,
    models::salah::parse_date,
    services::sync::{SyncReport, SyncRequest, SyncService},
    AppState,
};

fn parse_body(body: &[u8]) -> Result<SyncRequest, CoreError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SyncRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        CoreError::InvalidInput(format!(
            "expected {{\"date\": \"YYYY-MM-DD\", \"commit\": bool}}: {e}"
        ))
    })
}

/// POST /api/sync: import a day's times from the newest upload. An empty
/// body syncs today and commits.
pub async fn sync_timetable(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SyncReport>, (StatusCode, Json<Value>)> {
    let req = parse_body(&body).map_err(CoreError::into_http)?;
    let date = match req.date.as_deref() {
        Some(raw) => parse_date(raw).map_err(CoreError::into_http)?,
        None => Local::now().date_naive(),
    };
    SyncService::sync(
        &state.backend,
        &state.config.upload_dir,
        date,
        req.commit.unwrap_or(true),
    )
    .await
    .map(Json)
    .map_err(CoreError::into_http)
}
