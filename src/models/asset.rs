use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata for one uploaded file. Without a database index `created_at` is
/// the file's modification time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Asset {
    pub filename: String,
    pub content_type: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of recording an upload in the metadata index. The file itself is
/// already saved whichever variant comes back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum MetadataStatus {
    Recorded,
    /// Fallback mode keeps no index; the upload directory is the listing.
    NotTracked,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub status: &'static str,
    pub url: String,
    pub filename: String,
    pub content_type: String,
    pub metadata: MetadataStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssetQuery {
    pub limit: Option<i64>,
}
