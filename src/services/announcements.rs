use chrono::{DateTime, Utc};

use crate::{
    db::{fallback::read_json, Backend},
    error::CoreError,
    models::announcement::{Announcement, CreateAnnouncementRequest},
};

const ANNOUNCEMENT_COLS: &str = "id, message, start_at, end_at, priority, active, created_at";

pub struct AnnouncementService;

impl AnnouncementService {
    /// Announcements visible at `now`, highest priority first. Equal
    /// priorities keep insertion order.
    pub async fn list_active(
        backend: &Backend,
        now: DateTime<Utc>,
    ) -> Result<Vec<Announcement>, CoreError> {
        match backend {
            Backend::Database(pool) => {
                let rows = sqlx::query_as::<_, Announcement>(&format!(
                    "SELECT {ANNOUNCEMENT_COLS} FROM announcements
                     WHERE active = TRUE
                       AND (start_at IS NULL OR start_at <= $1)
                       AND (end_at IS NULL OR end_at >= $1)
                     ORDER BY priority DESC, seq ASC"
                ))
                .bind(now)
                .fetch_all(pool)
                .await?;
                Ok(rows)
            }
            Backend::Fallback(store) => {
                let all: Vec<Announcement> = read_json(&store.announcements_path)
                    .await
                    .unwrap_or_default();
                let mut visible: Vec<Announcement> =
                    all.into_iter().filter(|a| a.is_visible_at(now)).collect();
                visible.sort_by(|a, b| b.priority.cmp(&a.priority));
                Ok(visible)
            }
        }
    }

    pub async fn create(
        backend: &Backend,
        req: CreateAnnouncementRequest,
    ) -> Result<Announcement, CoreError> {
        req.validate()?;
        let announcement = req.into_announcement(Utc::now());

        let stored = match backend {
            Backend::Database(pool) => {
                sqlx::query_as::<_, Announcement>(&format!(
                    "INSERT INTO announcements (id, message, start_at, end_at, priority, active, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     RETURNING {ANNOUNCEMENT_COLS}"
                ))
                .bind(announcement.id)
                .bind(&announcement.message)
                .bind(announcement.start_at)
                .bind(announcement.end_at)
                .bind(announcement.priority)
                .bind(announcement.active)
                .bind(announcement.created_at)
                .fetch_one(pool)
                .await?
            }
            Backend::Fallback(store) => {
                store
                    .update(&store.announcements_path, |list: &mut Vec<Announcement>| {
                        list.push(announcement.clone());
                    })
                    .await?;
                announcement
            }
        };

        tracing::info!(id = %stored.id, priority = stored.priority, "announcement created");
        Ok(stored)
    }
}
