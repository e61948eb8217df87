use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL. `None` selects the JSON fallback backend.
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()),
            data_dir: env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".into())
                .into(),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "./uploads".into())
                .into(),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".into())
                .parse()?,
            max_upload_mb: env::var("MAX_UPLOAD_MB")
                .unwrap_or_else(|_| "50".into())
                .parse()?,
        })
    }

    pub fn salah_file(&self) -> PathBuf {
        self.data_dir.join("salah_times.json")
    }

    pub fn announcements_file(&self) -> PathBuf {
        self.data_dir.join("announcements.json")
    }
}
