pub mod announcements;
pub mod assets;
pub mod health;
pub mod salah;
pub mod sync;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::{services::assets::PUBLIC_PREFIX, AppState};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.max_upload_mb * 1024 * 1024;
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health_check))
        // Salah times
        .route("/api/salah/today", get(salah::get_today))
        .route("/api/salah", get(salah::get_salah).post(salah::upsert_salah))
        // Announcements
        .route(
            "/api/announcements",
            get(announcements::list_active).post(announcements::create),
        )
        // Assets
        .route("/api/assets", get(assets::list_assets))
        .route("/api/upload", post(assets::upload))
        .route("/api/sync", post(sync::sync_timetable))
        .nest_service(PUBLIC_PREFIX, uploads)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
