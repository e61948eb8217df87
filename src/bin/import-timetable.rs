/// Import one day's prayer times from the newest file in the upload directory
/// without going through the HTTP server.
///
/// Usage: import-timetable [--date YYYY-MM-DD] [--dry-run]
///   Uses DATABASE_URL when set, otherwise the JSON files under DATA_DIR.

use anyhow::Context;
use clap::Parser;

use masjid_display_api::{
    config::Config,
    db::Backend,
    models::salah::parse_date,
    services::sync::SyncService,
};

#[derive(Parser)]
#[command(name = "import-timetable", about = "Import prayer times from the latest uploaded timetable")]
struct Args {
    /// Date to import (defaults to today)
    #[arg(long)]
    date: Option<String>,

    /// Show what would be imported without saving it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let date = match args.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => chrono::Local::now().date_naive(),
    };

    let backend = Backend::from_config(&config)
        .await
        .context("could not open the configured backend")?;
    tracing::info!("Importing {} using the {} backend", date, backend.mode());

    let report = SyncService::sync(&backend, &config.upload_dir, date, !args.dry_run).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
