use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use masjid_display_api::{config::Config, db::Backend, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let backend = Backend::from_config(&config).await?;
    match &backend {
        Backend::Database(_) => info!("Database connected"),
        Backend::Fallback(store) => info!(
            "DATABASE_URL not set, using JSON fallback files {} and {}",
            store.salah_path.display(),
            store.announcements_path.display()
        ),
    }

    let state = AppState {
        backend,
        config: config.clone(),
    };
    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Masjid display API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
