pub mod fallback;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;
pub use fallback::FallbackStore;

/// Where persistence goes for the lifetime of the process. Resolved once at
/// startup and handed to every service call.
#[derive(Debug, Clone)]
pub enum Backend {
    Database(PgPool),
    Fallback(FallbackStore),
}

impl Backend {
    /// Connect when a database URL is configured, otherwise use the JSON files.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        match &config.database_url {
            Some(url) => {
                let pool = create_pool(url).await?;
                ensure_schema(&pool).await?;
                Ok(Backend::Database(pool))
            }
            None => Ok(Backend::fallback(config)),
        }
    }

    pub fn fallback(config: &Config) -> Self {
        Backend::Fallback(FallbackStore::new(
            config.salah_file(),
            config.announcements_file(),
        ))
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Backend::Database(_) => "database",
            Backend::Fallback(_) => "fallback",
        }
    }
}

pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Create the three tables if they are missing (idempotent, safe on every startup).
pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS salah_times (
            date            DATE PRIMARY KEY,
            fajr            TEXT,
            fajr_jamaat     TEXT,
            sunrise         TEXT,
            dhuhr           TEXT,
            dhuhr_jamaat    TEXT,
            asr             TEXT,
            asr_jamaat      TEXT,
            maghrib         TEXT,
            maghrib_jamaat  TEXT,
            isha            TEXT,
            isha_jamaat     TEXT,
            updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS announcements (
            id          UUID PRIMARY KEY,
            seq         BIGSERIAL,
            message     TEXT NOT NULL,
            start_at    TIMESTAMPTZ,
            end_at      TIMESTAMPTZ,
            priority    INTEGER NOT NULL DEFAULT 1,
            active      BOOLEAN NOT NULL DEFAULT TRUE,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS assets (
            id            BIGSERIAL PRIMARY KEY,
            filename      TEXT NOT NULL,
            content_type  TEXT NOT NULL,
            path          TEXT NOT NULL,
            created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database schema ready");
    Ok(())
}
