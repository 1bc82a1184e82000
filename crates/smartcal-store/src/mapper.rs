//! Conversion between the in-memory calendar and its stored JSON form.
//!
//! Instants are stored as RFC 3339 UTC strings with as many fractional digits
//! as needed, so a round trip never loses precision.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{CalendarSnapshot, Reminder, WeatherInfo};

/// Stored form of the whole calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    pub current_date: String,
    pub selected_date: Option<String>,
    pub reminders: Vec<StoredReminder>,
}

/// Stored form of a reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReminder {
    pub id: String,
    pub text: String,
    pub date: String,
    pub city: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherInfo>,
}

/// Errors turning a stored snapshot back into memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapperError {
    #[error("Invalid date in {field}: {value:?}")]
    InvalidDate { field: String, value: String },
}

/// Format an instant the way it is stored.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a stored ISO-8601 instant (any offset) into UTC.
pub fn parse_instant(field: &str, value: &str) -> Result<DateTime<Utc>, MapperError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| MapperError::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        })
}

/// Convert the in-memory calendar to its stored form.
pub fn to_storage(snapshot: &CalendarSnapshot) -> StoredSnapshot {
    StoredSnapshot {
        current_date: format_instant(&snapshot.current_date),
        selected_date: snapshot.selected_date.as_ref().map(format_instant),
        reminders: snapshot
            .reminders
            .iter()
            .map(|r| StoredReminder {
                id: r.id.clone(),
                text: r.text.clone(),
                date: format_instant(&r.date),
                city: r.city.clone(),
                color: r.color.clone(),
                weather: r.weather.clone(),
            })
            .collect(),
    }
}

/// Convert a stored snapshot back into memory.
///
/// # Errors
/// Returns `MapperError::InvalidDate` naming the first unparsable date field.
pub fn from_storage(stored: StoredSnapshot) -> Result<CalendarSnapshot, MapperError> {
    let current_date = parse_instant("currentDate", &stored.current_date)?;
    let selected_date = stored
        .selected_date
        .as_deref()
        .map(|value| parse_instant("selectedDate", value))
        .transpose()?;

    let reminders = stored
        .reminders
        .into_iter()
        .map(|r| {
            let date = parse_instant(&format!("reminders[{}].date", r.id), &r.date)?;
            Ok(Reminder {
                id: r.id,
                text: r.text,
                date,
                city: r.city,
                color: r.color,
                weather: r.weather,
            })
        })
        .collect::<Result<Vec<_>, MapperError>>()?;

    Ok(CalendarSnapshot {
        current_date,
        selected_date,
        reminders,
    })
}

/// Generate a new reminder ID.
///
/// UUID v7: a millisecond timestamp followed by random bits.
pub fn generate_reminder_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    fn snapshot() -> CalendarSnapshot {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        CalendarSnapshot {
            current_date: base + Duration::milliseconds(123),
            selected_date: Some(base),
            reminders: vec![
                Reminder {
                    id: "a".to_string(),
                    text: "Standup".to_string(),
                    date: base + Duration::nanoseconds(456_789),
                    city: String::new(),
                    color: "#3b82f6".to_string(),
                    weather: None,
                },
                Reminder {
                    id: "b".to_string(),
                    text: "Flight".to_string(),
                    date: base + Duration::hours(14),
                    city: "Paris".to_string(),
                    color: "#ef4444".to_string(),
                    weather: Some(WeatherInfo {
                        forecast: "clear sky".to_string(),
                        temperature: 4.2,
                        icon: Some("01d".to_string()),
                    }),
                },
            ],
        }
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let original = snapshot();
        let restored = from_storage(to_storage(&original)).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_round_trip_through_json() {
        let original = snapshot();
        let json = serde_json::to_string(&to_storage(&original)).unwrap();
        let stored: StoredSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(from_storage(stored).unwrap(), original);
    }

    #[test]
    fn test_wire_layout() {
        let mut snap = snapshot();
        snap.selected_date = None;
        let value = serde_json::to_value(to_storage(&snap)).unwrap();

        assert_eq!(value["currentDate"], "2024-01-15T09:00:00.123Z");
        assert!(value["selectedDate"].is_null());
        assert_eq!(value["reminders"][1]["date"], "2024-01-15T23:00:00Z");
        assert_eq!(value["reminders"][1]["weather"]["temperature"], 4.2);
        assert!(value["reminders"][0].get("weather").is_none());
    }

    #[test]
    fn test_reads_javascript_iso_strings() {
        let stored: StoredSnapshot = serde_json::from_str(
            r##"{
                "currentDate": "2024-03-01T12:30:00.000Z",
                "selectedDate": null,
                "reminders": [
                    {"id": "lq3k9x", "text": "Gym", "date": "2024-03-02T18:00:00.000Z",
                     "city": "", "color": "#10b981"}
                ]
            }"##,
        )
        .unwrap();

        let snap = from_storage(stored).unwrap();
        assert_eq!(snap.reminders[0].date, Utc.with_ymd_and_hms(2024, 3, 2, 18, 0, 0).unwrap());
        assert!(snap.selected_date.is_none());
    }

    #[test]
    fn test_invalid_date_is_reported() {
        let mut stored = to_storage(&snapshot());
        stored.reminders[1].date = "not a date".to_string();

        let err = from_storage(stored).unwrap_err();
        assert_eq!(
            err,
            MapperError::InvalidDate {
                field: "reminders[b].date".to_string(),
                value: "not a date".to_string(),
            }
        );
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_reminder_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
