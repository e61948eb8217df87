use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use axum::extract::Multipart;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{
    db::Backend,
    error::{truncate_cause, CoreError},
    models::asset::{Asset, MetadataStatus, UploadOutcome},
};

/// URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

fn public_path(filename: &str) -> String {
    format!("{PUBLIC_PREFIX}/{filename}")
}

fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .map(str::to_string)
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
}

/// `poster.png` → `poster_20240301120000123456.png`. Directory components and
/// leading dots of the client-supplied name are dropped.
pub fn storage_name(original: &str, now: DateTime<Utc>) -> String {
    let base = Path::new(original)
        .file_name()
        .map(|n| n.to_string_lossy().trim_start_matches('.').to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "upload".to_string());
    let base = Path::new(&base);
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    let stamp = now.format("%Y%m%d%H%M%S%6f");
    match base.extension() {
        Some(ext) => format!("{stem}_{stamp}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{stamp}"),
    }
}

/// Uploads are staged under a dot-prefixed name until complete.
pub fn is_in_progress(name: &str) -> bool {
    name.starts_with('.')
}

const NAME_ATTEMPTS: usize = 8;

/// Stage `bytes` in a hidden temp file, then link it under a fresh storage
/// name. Linking fails instead of replacing, so an existing upload is never
/// overwritten and readers only ever see complete files.
async fn store_new_file<C>(
    upload_dir: &Path,
    original_name: &str,
    bytes: &[u8],
    mut clock: C,
) -> Result<String, CoreError>
where
    C: FnMut() -> DateTime<Utc>,
{
    tokio::fs::create_dir_all(upload_dir).await?;

    let tmp: PathBuf = upload_dir.join(format!(".upload.{}.part", Uuid::new_v4().simple()));
    let staged = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;
    if let Err(e) = staged {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    let mut result = Err(CoreError::Storage(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free storage name for {original_name}"),
    )));
    for _ in 0..NAME_ATTEMPTS {
        let filename = storage_name(original_name, clock());
        match tokio::fs::hard_link(&tmp, upload_dir.join(&filename)).await {
            Ok(()) => {
                result = Ok(filename);
                break;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("storage name {filename} taken, retrying");
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            Err(e) => {
                result = Err(e.into());
                break;
            }
        }
    }
    let _ = tokio::fs::remove_file(&tmp).await;
    result
}

pub struct AssetService;

impl AssetService {
    /// Most recent uploads first. Without a database the upload directory
    /// itself is listed, newest name first.
    pub async fn list(
        backend: &Backend,
        upload_dir: &Path,
        limit: usize,
    ) -> Result<Vec<Asset>, CoreError> {
        match backend {
            Backend::Database(pool) => {
                let rows = sqlx::query_as::<_, Asset>(
                    "SELECT filename, content_type, path, created_at FROM assets
                     ORDER BY created_at DESC, id DESC LIMIT $1",
                )
                .bind(limit as i64)
                .fetch_all(pool)
                .await?;
                Ok(rows)
            }
            Backend::Fallback(_) => Ok(Self::list_dir(upload_dir, limit).await),
        }
    }

    async fn list_dir(upload_dir: &Path, limit: usize) -> Vec<Asset> {
        let mut entries = match tokio::fs::read_dir(upload_dir).await {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("upload dir {} not listable: {e}", upload_dir.display());
                return Vec::new();
            }
        };

        let mut files: Vec<(String, DateTime<Utc>)> = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_in_progress(&name) {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((name, DateTime::<Utc>::from(modified)));
        }
        files.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        files.truncate(limit);

        files
            .into_iter()
            .map(|(filename, created_at)| Asset {
                content_type: guess_content_type(&filename),
                path: public_path(&filename),
                filename,
                created_at,
            })
            .collect()
    }

    /// Pull the `file` field out of a multipart body and store it.
    pub async fn upload(
        backend: &Backend,
        upload_dir: &Path,
        mut multipart: Multipart,
    ) -> Result<UploadOutcome, CoreError> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| CoreError::InvalidInput(e.to_string()))?
        {
            if field.name() != Some("file") {
                continue;
            }
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| CoreError::InvalidInput(e.to_string()))?;
            return Self::save(backend, upload_dir, &filename, content_type.as_deref(), &bytes)
                .await;
        }
        Err(CoreError::InvalidInput("no file uploaded (expected multipart field `file`)".into()))
    }

    /// Write the file, then try to index it. Only the file write can fail the call.
    pub async fn save(
        backend: &Backend,
        upload_dir: &Path,
        original_name: &str,
        declared_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<UploadOutcome, CoreError> {
        let filename = store_new_file(upload_dir, original_name, bytes, Utc::now).await?;
        tracing::info!("stored upload {} ({} bytes)", filename, bytes.len());

        let content_type = declared_type
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(&filename));
        let url = public_path(&filename);

        let metadata = match backend {
            Backend::Fallback(_) => MetadataStatus::NotTracked,
            Backend::Database(pool) => {
                let res = sqlx::query(
                    "INSERT INTO assets (filename, content_type, path) VALUES ($1, $2, $3)",
                )
                .bind(&filename)
                .bind(&content_type)
                .bind(&url)
                .execute(pool)
                .await;
                match res {
                    Ok(_) => MetadataStatus::Recorded,
                    Err(e) => {
                        tracing::warn!("asset metadata insert failed for {filename}: {e}");
                        MetadataStatus::Failed(truncate_cause(&e.to_string()))
                    }
                }
            }
        };

        Ok(UploadOutcome {
            status: "ok",
            url,
            filename,
            content_type,
            metadata,
        })
    }
}
