use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    db::Backend,
    error::CoreError,
    models::salah::{is_canonical_time, PrayerField, PrayerTimes},
    services::{
        assets, row_match,
        salah::{SalahService, WriteMode},
        tabular::{self, Row, TableFormat},
        time_format,
    },
};

/// Body for POST /api/sync.
#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    /// `YYYY-MM-DD`, today when omitted.
    pub date: Option<String>,
    pub commit: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub source: String,
    pub date: NaiveDate,
    pub committed: bool,
    pub extracted: PrayerTimes,
}

/// Normalize every recognised time column of `row`. Missing, unparseable
/// and non-canonical values are left out.
pub fn extract_times(row: &Row) -> PrayerTimes {
    let mut times = PrayerTimes::default();
    for field in PrayerField::ALL {
        let Some(raw) = row.get(field.as_str()) else {
            continue;
        };
        match time_format::normalize(raw) {
            Some(t) if is_canonical_time(&t) => times.set(field, Some(t)),
            Some(t) => tracing::debug!("dropping out-of-range {field} value {raw:?} -> {t}"),
            None => tracing::debug!("could not read {field} value {raw:?}"),
        }
    }
    times
}

pub struct SyncService;

impl SyncService {
    /// The most recently modified regular file in `upload_dir`.
    pub async fn latest_upload(upload_dir: &Path) -> Result<PathBuf, CoreError> {
        let mut entries = match tokio::fs::read_dir(upload_dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(CoreError::NoSource),
            Err(e) => return Err(e.into()),
        };

        let mut latest: Option<(SystemTime, PathBuf)> = None;
        while let Some(entry) = entries.next_entry().await? {
            if assets::is_in_progress(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            if latest.as_ref().map_or(true, |(t, _)| modified > *t) {
                latest = Some((modified, entry.path()));
            }
        }
        latest.map(|(_, p)| p).ok_or(CoreError::NoSource)
    }

    /// Import `target_date`'s times from the newest upload, optionally
    /// merging them into the stored record.
    pub async fn sync(
        backend: &Backend,
        upload_dir: &Path,
        target_date: NaiveDate,
        commit: bool,
    ) -> Result<SyncReport, CoreError> {
        let path = Self::latest_upload(upload_dir).await?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let format = TableFormat::from_path(&path)?;
        let rows = tabular::parse(&path, format)?;
        tracing::info!("sync: parsed {} rows from {source}", rows.len());

        let date_key = target_date.to_string();
        let extracted = row_match::select(&rows, &date_key)
            .map(extract_times)
            .unwrap_or_default();
        if extracted.is_empty() {
            return Err(CoreError::NothingExtractable { filename: source });
        }

        if commit {
            SalahService::upsert(backend, target_date, &extracted, WriteMode::Merge).await?;
            tracing::info!(
                "sync: committed {} fields for {date_key} from {source}",
                extracted.populated().len()
            );
        }

        Ok(SyncReport {
            source,
            date: target_date,
            committed: commit,
            extracted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FallbackStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        uploads: PathBuf,
        backend: Backend,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        let backend = Backend::Fallback(FallbackStore::new(
            dir.path().join("salah_times.json"),
            dir.path().join("announcements.json"),
        ));
        Fixture { _dir: dir, uploads, backend }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn extract_skips_bad_values() {
        let row: Row = [
            ("fajr", "615"),
            ("dhuhr", "noon"),
            ("asr", "4:99"),
            ("isha_jamaat", "8.30pm"),
            ("notes", "ignored"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let t = extract_times(&row);
        assert_eq!(t.fajr.as_deref(), Some("06:15"));
        assert_eq!(t.dhuhr, None);
        assert_eq!(t.asr, None);
        assert_eq!(t.isha_jamaat.as_deref(), Some("08:30"));
        assert_eq!(t.populated(), vec!["fajr", "isha_jamaat"]);
    }

    #[tokio::test]
    async fn csv_sync_commits_and_reads_back() {
        let fx = fixture();
        std::fs::write(fx.uploads.join("times.csv"), "date,fajr,dhuhr\n2024-03-01,6:15,12:30\n")
            .unwrap();

        let report = SyncService::sync(&fx.backend, &fx.uploads, date("2024-03-01"), true)
            .await
            .unwrap();
        assert!(report.committed);
        assert_eq!(report.source, "times.csv");

        let stored = SalahService::get_by_date(&fx.backend, date("2024-03-01")).await.unwrap();
        assert_eq!(stored.times.fajr.as_deref(), Some("06:15"));
        assert_eq!(stored.times.dhuhr.as_deref(), Some("12:30"));
    }

    #[tokio::test]
    async fn single_row_falls_back_under_requested_date() {
        let fx = fixture();
        std::fs::write(fx.uploads.join("today.csv"), "date,fajr\n2024-01-15,5:45\n").unwrap();

        SyncService::sync(&fx.backend, &fx.uploads, date("2024-03-01"), true)
            .await
            .unwrap();
        let stored = SalahService::get_by_date(&fx.backend, date("2024-03-01")).await.unwrap();
        assert_eq!(stored.times.fajr.as_deref(), Some("05:45"));
    }

    #[tokio::test]
    async fn nothing_extractable_writes_nothing() {
        let fx = fixture();
        std::fs::write(fx.uploads.join("junk.csv"), "name,colour\nposter,blue\n").unwrap();

        let err = SyncService::sync(&fx.backend, &fx.uploads, date("2024-03-01"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NothingExtractable { ref filename } if filename == "junk.csv"));

        let Backend::Fallback(store) = &fx.backend else { unreachable!() };
        assert!(!store.salah_path.exists());
    }

    #[tokio::test]
    async fn preview_does_not_commit() {
        let fx = fixture();
        std::fs::write(fx.uploads.join("t.json"), r#"{"2024-03-01": {"maghrib": "1802"}}"#)
            .unwrap();

        let report = SyncService::sync(&fx.backend, &fx.uploads, date("2024-03-01"), false)
            .await
            .unwrap();
        assert!(!report.committed);
        assert_eq!(report.extracted.maghrib.as_deref(), Some("18:02"));

        let stored = SalahService::get_by_date(&fx.backend, date("2024-03-01")).await.unwrap();
        assert!(stored.times.is_empty());
    }

    #[tokio::test]
    async fn second_sync_merges_into_existing_record() {
        let fx = fixture();
        std::fs::write(fx.uploads.join("a.csv"), "date,fajr,isha\n2024-03-01,5:00,20:00\n").unwrap();
        SyncService::sync(&fx.backend, &fx.uploads, date("2024-03-01"), true)
            .await
            .unwrap();

        std::fs::remove_file(fx.uploads.join("a.csv")).unwrap();
        std::fs::write(fx.uploads.join("b.csv"), "date,fajr\n2024-03-01,5:10\n").unwrap();
        SyncService::sync(&fx.backend, &fx.uploads, date("2024-03-01"), true)
            .await
            .unwrap();

        let stored = SalahService::get_by_date(&fx.backend, date("2024-03-01")).await.unwrap();
        assert_eq!(stored.times.fajr.as_deref(), Some("05:10"));
        assert_eq!(stored.times.isha.as_deref(), Some("20:00"));
    }

    #[tokio::test]
    async fn staged_upload_is_never_the_source() {
        let fx = fixture();
        std::fs::write(fx.uploads.join("done.csv"), "date,fajr\n2024-03-01,5:00\n").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        std::fs::write(fx.uploads.join(".upload.abc.part"), "date,fa").unwrap();

        let latest = SyncService::latest_upload(&fx.uploads).await.unwrap();
        assert_eq!(latest, fx.uploads.join("done.csv"));

        std::fs::remove_file(fx.uploads.join("done.csv")).unwrap();
        let err = SyncService::latest_upload(&fx.uploads).await.unwrap_err();
        assert_eq!(err.code(), "no_source");
    }

    #[tokio::test]
    async fn empty_upload_dir_is_no_source() {
        let fx = fixture();
        let err = SyncService::sync(&fx.backend, &fx.uploads, date("2024-03-01"), true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "no_source");

        let err = SyncService::sync(&fx.backend, &fx.uploads.join("missing"), date("2024-03-01"), true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "no_source");
    }

    #[tokio::test]
    async fn unknown_extension_is_unsupported_not_parse_failure() {
        let fx = fixture();
        std::fs::write(fx.uploads.join("poster.png"), b"\x89PNG").unwrap();
        let err = SyncService::sync(&fx.backend, &fx.uploads, date("2024-03-01"), true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unsupported_format");
    }

    #[tokio::test]
    async fn corrupt_json_is_parse_failure() {
        let fx = fixture();
        std::fs::write(fx.uploads.join("t.json"), b"{broken").unwrap();
        let err = SyncService::sync(&fx.backend, &fx.uploads, date("2024-03-01"), true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "parse_failed");
    }
}
