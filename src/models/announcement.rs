use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub message: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub priority: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Announcement {
    /// Visible at `now`: active and inside its (open-ended) window.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.start_at.map_or(true, |s| s <= now)
            && self.end_at.map_or(true, |e| e >= now)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub message: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    /// 1 (low) to 5 (high)
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_priority() -> i32 {
    1
}

fn default_active() -> bool {
    true
}

impl CreateAnnouncementRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.message.trim().is_empty() {
            return Err(CoreError::InvalidInput("message must not be empty".into()));
        }
        if !(1..=5).contains(&self.priority) {
            return Err(CoreError::InvalidInput(format!(
                "priority must be between 1 and 5, got {}",
                self.priority
            )));
        }
        Ok(())
    }

    pub fn into_announcement(self, created_at: DateTime<Utc>) -> Announcement {
        Announcement {
            id: Uuid::new_v4(),
            message: self.message,
            start_at: self.start_at,
            end_at: self.end_at,
            priority: self.priority,
            active: self.active,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(priority: i32, message: &str) -> CreateAnnouncementRequest {
        CreateAnnouncementRequest {
            message: message.into(),
            start_at: None,
            end_at: None,
            priority,
            active: true,
        }
    }

    #[test]
    fn defaults_apply_when_omitted() {
        let req: CreateAnnouncementRequest =
            serde_json::from_value(serde_json::json!({ "message": "Jumuah at 13:30" })).unwrap();
        assert_eq!(req.priority, 1);
        assert!(req.active);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_priority_and_blank_message() {
        assert!(request(0, "hi").validate().is_err());
        assert!(request(6, "hi").validate().is_err());
        assert!(request(3, "   ").validate().is_err());
        assert!(request(5, "hi").validate().is_ok());
    }

    #[test]
    fn visibility_window_is_inclusive_and_open_ended() {
        let now = Utc::now();
        let mut a = request(1, "x").into_announcement(now);
        assert!(a.is_visible_at(now));

        a.start_at = Some(now);
        a.end_at = Some(now);
        assert!(a.is_visible_at(now));

        a.end_at = Some(now - Duration::seconds(1));
        assert!(!a.is_visible_at(now));

        a.end_at = None;
        a.start_at = Some(now + Duration::minutes(5));
        assert!(!a.is_visible_at(now));

        a.start_at = None;
        a.active = false;
        assert!(!a.is_visible_at(now));
    }
}
