use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde_json::{json, Value};

use crate::{
    error::CoreError,
    models::salah::{parse_date, PrayerDayRecord, SalahQuery, UpsertSalahRequest},
    services::salah::{SalahService, WriteMode},
    AppState,
};

/// How many days GET /api/salah returns without a date.
const RECENT_DAYS: usize = 30;

/// GET /api/salah/today
pub async fn get_today(
    State(state): State<AppState>,
) -> Result<Json<PrayerDayRecord>, (StatusCode, Json<Value>)> {
    let today = Local::now().date_naive();
    SalahService::get_by_date(&state.backend, today)
        .await
        .map(Json)
        .map_err(CoreError::into_http)
}

/// GET /api/salah?d=YYYY-MM-DD: one day, or the most recent days when `d` is absent.
pub async fn get_salah(
    State(state): State<AppState>,
    Query(params): Query<SalahQuery>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    match params.d.as_deref() {
        None => SalahService::list_recent(&state.backend, RECENT_DAYS)
            .await
            .map(|records| Json(records).into_response())
            .map_err(CoreError::into_http),
        Some(raw) => {
            let date = parse_date(raw).map_err(CoreError::into_http)?;
            SalahService::get_by_date(&state.backend, date)
                .await
                .map(|record| Json(record).into_response())
                .map_err(CoreError::into_http)
        }
    }
}

/// POST /api/salah: replaces the stored times for the date.
pub async fn upsert_salah(
    State(state): State<AppState>,
    Json(body): Json<UpsertSalahRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let (date, times) = body.validate().map_err(CoreError::into_http)?;
    SalahService::upsert(&state.backend, date, &times, WriteMode::Replace)
        .await
        .map(|record| Json(json!({ "status": "ok", "date": record.date })))
        .map_err(CoreError::into_http)
}
