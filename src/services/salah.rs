use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use crate::{
    db::{Backend, FallbackStore},
    error::CoreError,
    models::salah::{PrayerDayRecord, PrayerField, PrayerTimes},
};

/// Fallback document: ISO date → record.
type SalahMap = BTreeMap<String, PrayerDayRecord>;

/// How an incoming record combines with what is stored for its date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Every field is taken from the incoming record, absent ones become null.
    Replace,
    /// Only fields present in the incoming record are written.
    Merge,
}

fn select_cols() -> String {
    let times: Vec<&str> = PrayerField::ALL.iter().map(|f| f.as_str()).collect();
    format!("date, {}, updated_at", times.join(", "))
}

fn upsert_sql(mode: WriteMode) -> String {
    let names: Vec<&str> = PrayerField::ALL.iter().map(|f| f.as_str()).collect();
    let placeholders: Vec<String> = (2..=names.len() + 1).map(|i| format!("${i}")).collect();
    let assignments: Vec<String> = names
        .iter()
        .map(|c| match mode {
            WriteMode::Replace => format!("{c} = EXCLUDED.{c}"),
            WriteMode::Merge => format!("{c} = COALESCE(EXCLUDED.{c}, salah_times.{c})"),
        })
        .collect();
    format!(
        "INSERT INTO salah_times (date, {cols}, updated_at)
         VALUES ($1, {vals}, NOW())
         ON CONFLICT (date) DO UPDATE SET {set}, updated_at = NOW()
         RETURNING {ret}",
        cols = names.join(", "),
        vals = placeholders.join(", "),
        set = assignments.join(", "),
        ret = select_cols(),
    )
}

pub struct SalahService;

impl SalahService {
    /// The record for `date`, or a `{date}` stub when nothing is stored yet.
    pub async fn get_by_date(
        backend: &Backend,
        date: NaiveDate,
    ) -> Result<PrayerDayRecord, CoreError> {
        let found = match backend {
            Backend::Database(pool) => Self::db_get(pool, date).await?,
            Backend::Fallback(store) => Self::fallback_load(store)
                .await
                .remove(&date.to_string()),
        };
        Ok(found.unwrap_or_else(|| PrayerDayRecord::stub(date)))
    }

    /// Up to `limit` records, newest date first.
    pub async fn list_recent(
        backend: &Backend,
        limit: usize,
    ) -> Result<Vec<PrayerDayRecord>, CoreError> {
        match backend {
            Backend::Database(pool) => {
                let records = sqlx::query_as::<_, PrayerDayRecord>(&format!(
                    "SELECT {} FROM salah_times ORDER BY date DESC LIMIT $1",
                    select_cols()
                ))
                .bind(limit as i64)
                .fetch_all(pool)
                .await?;
                Ok(records)
            }
            Backend::Fallback(store) => {
                let mut records: Vec<PrayerDayRecord> =
                    Self::fallback_load(store).await.into_values().collect();
                records.sort_by(|a, b| b.date.cmp(&a.date));
                records.truncate(limit);
                Ok(records)
            }
        }
    }

    /// Insert or update the record for `date` and stamp `updated_at`.
    pub async fn upsert(
        backend: &Backend,
        date: NaiveDate,
        times: &PrayerTimes,
        mode: WriteMode,
    ) -> Result<PrayerDayRecord, CoreError> {
        let record = match backend {
            Backend::Database(pool) => {
                let sql = upsert_sql(mode);
                let mut query = sqlx::query_as::<sqlx::Postgres, PrayerDayRecord>(&sql).bind(date);
                for field in PrayerField::ALL {
                    query = query.bind(times.get(field));
                }
                query.fetch_one(pool).await?
            }
            Backend::Fallback(store) => {
                let key = date.to_string();
                store
                    .update(&store.salah_path, |map: &mut SalahMap| {
                        let entry = map
                            .entry(key)
                            .or_insert_with(|| PrayerDayRecord::stub(date));
                        match mode {
                            WriteMode::Replace => entry.times = times.clone(),
                            WriteMode::Merge => entry.times.merge_from(times),
                        }
                        entry.updated_at = Some(Utc::now());
                        entry.clone()
                    })
                    .await?
            }
        };
        tracing::debug!(%date, ?mode, backend = backend.mode(), "salah times saved");
        Ok(record)
    }

    async fn db_get(pool: &PgPool, date: NaiveDate) -> Result<Option<PrayerDayRecord>, CoreError> {
        let record = sqlx::query_as::<_, PrayerDayRecord>(&format!(
            "SELECT {} FROM salah_times WHERE date = $1",
            select_cols()
        ))
        .bind(date)
        .fetch_optional(pool)
        .await?;
        Ok(record)
    }

    async fn fallback_load(store: &FallbackStore) -> SalahMap {
        crate::db::fallback::read_json(&store.salah_path)
            .await
            .unwrap_or_default()
    }
}
