use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

/// Longest cause string carried in a rejection.
const MAX_CAUSE_LEN: usize = 200;

/// Every rejection the core can produce. Reads that find nothing are not
/// errors; they return stub or empty results instead.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("parse failed: {0}")]
    ParseFailed(String),

    #[error("no uploaded file to sync from")]
    NoSource,

    #[error("no prayer times could be extracted from {filename}")]
    NothingExtractable { filename: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn parse_failed(cause: impl std::fmt::Display) -> Self {
        CoreError::ParseFailed(truncate_cause(&cause.to_string()))
    }

    /// Stable machine-readable name of the condition.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidInput(_) => "invalid_input",
            CoreError::UnsupportedFormat(_) => "unsupported_format",
            CoreError::ParseFailed(_) => "parse_failed",
            CoreError::NoSource => "no_source",
            CoreError::NothingExtractable { .. } => "nothing_extractable",
            CoreError::Database(_) => "database_error",
            CoreError::Storage(_) => "storage_error",
            CoreError::Serialization(_) => "storage_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::InvalidInput(_) | CoreError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            CoreError::ParseFailed(_) | CoreError::NothingExtractable { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CoreError::NoSource => StatusCode::NOT_FOUND,
            CoreError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::Storage(_) | CoreError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Shape used by every handler for a rejected request.
    pub fn into_http(self) -> (StatusCode, Json<Value>) {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        }
        (
            status,
            Json(json!({ "error": self.code(), "detail": truncate_cause(&self.to_string()) })),
        )
    }
}

pub fn truncate_cause(cause: &str) -> String {
    match cause.char_indices().nth(MAX_CAUSE_LEN) {
        Some((idx, _)) => format!("{}…", &cause[..idx]),
        None => cause.to_string(),
    }
}
