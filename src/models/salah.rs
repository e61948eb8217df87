use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::CoreError;

/// The eleven recognised time columns of a timetable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrayerField {
    Fajr,
    FajrJamaat,
    Sunrise,
    Dhuhr,
    DhuhrJamaat,
    Asr,
    AsrJamaat,
    Maghrib,
    MaghribJamaat,
    Isha,
    IshaJamaat,
}

impl PrayerField {
    pub const ALL: [PrayerField; 11] = [
        PrayerField::Fajr,
        PrayerField::FajrJamaat,
        PrayerField::Sunrise,
        PrayerField::Dhuhr,
        PrayerField::DhuhrJamaat,
        PrayerField::Asr,
        PrayerField::AsrJamaat,
        PrayerField::Maghrib,
        PrayerField::MaghribJamaat,
        PrayerField::Isha,
        PrayerField::IshaJamaat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerField::Fajr => "fajr",
            PrayerField::FajrJamaat => "fajr_jamaat",
            PrayerField::Sunrise => "sunrise",
            PrayerField::Dhuhr => "dhuhr",
            PrayerField::DhuhrJamaat => "dhuhr_jamaat",
            PrayerField::Asr => "asr",
            PrayerField::AsrJamaat => "asr_jamaat",
            PrayerField::Maghrib => "maghrib",
            PrayerField::MaghribJamaat => "maghrib_jamaat",
            PrayerField::Isha => "isha",
            PrayerField::IshaJamaat => "isha_jamaat",
        }
    }
}

impl std::fmt::Display for PrayerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adhan and jamaat times for one day. Every present value is canonical `HH:MM`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PrayerTimes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fajr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fajr_jamaat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhuhr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhuhr_jamaat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asr_jamaat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maghrib: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maghrib_jamaat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isha_jamaat: Option<String>,
}

impl PrayerTimes {
    pub fn get(&self, field: PrayerField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: PrayerField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    fn slot(&self, field: PrayerField) -> &Option<String> {
        match field {
            PrayerField::Fajr => &self.fajr,
            PrayerField::FajrJamaat => &self.fajr_jamaat,
            PrayerField::Sunrise => &self.sunrise,
            PrayerField::Dhuhr => &self.dhuhr,
            PrayerField::DhuhrJamaat => &self.dhuhr_jamaat,
            PrayerField::Asr => &self.asr,
            PrayerField::AsrJamaat => &self.asr_jamaat,
            PrayerField::Maghrib => &self.maghrib,
            PrayerField::MaghribJamaat => &self.maghrib_jamaat,
            PrayerField::Isha => &self.isha,
            PrayerField::IshaJamaat => &self.isha_jamaat,
        }
    }

    fn slot_mut(&mut self, field: PrayerField) -> &mut Option<String> {
        match field {
            PrayerField::Fajr => &mut self.fajr,
            PrayerField::FajrJamaat => &mut self.fajr_jamaat,
            PrayerField::Sunrise => &mut self.sunrise,
            PrayerField::Dhuhr => &mut self.dhuhr,
            PrayerField::DhuhrJamaat => &mut self.dhuhr_jamaat,
            PrayerField::Asr => &mut self.asr,
            PrayerField::AsrJamaat => &mut self.asr_jamaat,
            PrayerField::Maghrib => &mut self.maghrib,
            PrayerField::MaghribJamaat => &mut self.maghrib_jamaat,
            PrayerField::Isha => &mut self.isha,
            PrayerField::IshaJamaat => &mut self.isha_jamaat,
        }
    }

    pub fn is_empty(&self) -> bool {
        PrayerField::ALL.iter().all(|f| self.slot(*f).is_none())
    }

    /// Names of the populated fields, in timetable order.
    pub fn populated(&self) -> Vec<&'static str> {
        PrayerField::ALL
            .iter()
            .filter(|f| self.slot(**f).is_some())
            .map(|f| f.as_str())
            .collect()
    }

    /// Overwrite only the fields that `other` carries.
    pub fn merge_from(&mut self, other: &PrayerTimes) {
        for field in PrayerField::ALL {
            if let Some(v) = other.get(field) {
                self.set(field, Some(v.to_string()));
            }
        }
    }

    /// Reject any present value that is not canonical `HH:MM`.
    pub fn validate(&self) -> Result<(), CoreError> {
        for field in PrayerField::ALL {
            if let Some(v) = self.get(field) {
                if !is_canonical_time(v) {
                    return Err(CoreError::InvalidInput(format!(
                        "{field} must be HH:MM (24-hour), got {v:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// `^[0-2][0-9]:[0-5][0-9]$`
pub fn is_canonical_time(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 5
        && matches!(b[0], b'0'..=b'2')
        && b[1].is_ascii_digit()
        && b[2] == b':'
        && matches!(b[3], b'0'..=b'5')
        && b[4].is_ascii_digit()
}

/// Parse an ISO `YYYY-MM-DD` date, rejecting anything else before any I/O happens.
pub fn parse_date(raw: &str) -> Result<NaiveDate, CoreError> {
    let trimmed = raw.trim();
    if trimmed.len() != 10 {
        return Err(CoreError::InvalidInput(format!(
            "date must be YYYY-MM-DD, got {raw:?}"
        )));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| CoreError::InvalidInput(format!("date must be YYYY-MM-DD, got {raw:?}")))
}

/// One stored day of the timetable, keyed by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PrayerDayRecord {
    pub date: NaiveDate,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub times: PrayerTimes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PrayerDayRecord {
    /// Placeholder returned when a date has no data yet.
    pub fn stub(date: NaiveDate) -> Self {
        Self {
            date,
            times: PrayerTimes::default(),
            updated_at: None,
        }
    }
}

/// Body for POST /api/salah.
#[derive(Debug, Deserialize)]
pub struct UpsertSalahRequest {
    pub date: String,
    #[serde(flatten)]
    pub times: PrayerTimes,
}

impl UpsertSalahRequest {
    pub fn validate(self) -> Result<(NaiveDate, PrayerTimes), CoreError> {
        let date = parse_date(&self.date)?;
        self.times.validate()?;
        Ok((date, self.times))
    }
}

/// Query params for GET /api/salah.
#[derive(Debug, Deserialize)]
pub struct SalahQuery {
    pub d: Option<String>,
}
