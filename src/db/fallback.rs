use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::CoreError;

/// JSON files standing in for the database when none is configured.
///
/// Writers inside one process are serialized by `write_lock`, so two admin
/// edits cannot lose each other's keys. Separate processes sharing the same
/// directory still race at the rename and the last writer wins.
#[derive(Debug, Clone)]
pub struct FallbackStore {
    pub salah_path: PathBuf,
    pub announcements_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FallbackStore {
    pub fn new(salah_path: PathBuf, announcements_path: PathBuf) -> Self {
        Self {
            salah_path,
            announcements_path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load, mutate and atomically rewrite the document at `path`.
    /// A missing or undecodable file starts from `T::default()`.
    pub async fn update<T, R, F>(&self, path: &Path, mutate: F) -> Result<R, CoreError>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> R,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc: T = read_json(path).await.unwrap_or_default();
        let out = mutate(&mut doc);
        write_json_atomic(path, &doc).await?;
        Ok(out)
    }
}

/// Read a JSON document. Missing and corrupt files both come back as `None`.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("fallback read of {} failed: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("fallback file {} is not valid JSON: {e}", path.display());
            None
        }
    }
}

/// Serialize to a sibling temp file, then rename over `path`.
/// Readers see either the previous document or the new one.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("fallback.json");
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    let written = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
