//! Google Calendar events, fetched with a connection token.
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::services::auth::token::BearerToken;
use crate::services::downstream::{DownstreamClient, DownstreamError};

/// Connection scope the calendar lookups need.
pub const CALENDAR_EVENTS_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events.readonly";

const MAX_RESULTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EventWindow {
    /// Whole UTC day containing `now`.
    pub fn day_of(now: DateTime<Utc>) -> Self {
        let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self {
            start,
            end: start + Duration::days(1) - Duration::milliseconds(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub summary: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

pub async fn list_events(
    client: &DownstreamClient,
    events_url: &str,
    token: &BearerToken,
    window: EventWindow,
) -> Result<Vec<CalendarEvent>, DownstreamError> {
    let query = [
        ("timeMin", window.start.to_rfc3339()),
        ("timeMax", window.end.to_rfc3339()),
        ("singleEvents", "true".to_string()),
        ("orderBy", "startTime".to_string()),
        ("maxResults", MAX_RESULTS.to_string()),
    ];

    let body = client.get_json_with_query(events_url, token, &query).await?;
    Ok(parse_events(&body))
}

fn parse_events(body: &Value) -> Vec<CalendarEvent> {
    let Some(items) = body.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| {
            let text = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);
            // all-day events only carry `date`
            let when = |key: &str| {
                item.get(key).and_then(|t| {
                    t.get("dateTime")
                        .or_else(|| t.get("date"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
            };

            CalendarEvent {
                id: text("id"),
                summary: text("summary").unwrap_or_else(|| "Untitled Event".to_string()),
                start: when("start"),
                end: when("end"),
                location: text("location"),
                description: text("description"),
            }
        })
        .collect()
}

/// Plain-text rendering used by the MCP tool.
pub fn summarize(day: DateTime<Utc>, events: &[CalendarEvent]) -> String {
    let mut out = format!("Calendar Summary for {}\n\n", day.format("%a %b %d %Y"));

    if events.is_empty() {
        out.push_str("No events scheduled for today.");
        return out;
    }

    out.push_str(&format!("You have {} event(s) today:\n\n", events.len()));
    for (i, event) in events.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, event.summary));
        let start = event.start.as_deref().unwrap_or("All day");
        match event.end.as_deref() {
            Some(end) => out.push_str(&format!("   Time: {} - {}\n", start, end)),
            None => out.push_str(&format!("   Time: {}\n", start)),
        }
        if let Some(location) = &event.location {
            out.push_str(&format!("   Location: {}\n", location));
        }
        if let Some(description) = &event.description {
            out.push_str(&format!("   Description: {}\n", description));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn day_window_covers_the_whole_day() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 15, 30, 0).unwrap();
        let window = EventWindow::day_of(now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap());
        assert!(window.end < Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_timed_and_all_day_events() {
        let body = json!({"items": [
            {"id": "1", "summary": "Standup", "start": {"dateTime": "2026-03-04T09:00:00Z"}, "end": {"dateTime": "2026-03-04T09:15:00Z"}, "location": "Room 1"},
            {"id": "2", "start": {"date": "2026-03-04"}}
        ]});
        let events = parse_events(&body);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start.as_deref(), Some("2026-03-04T09:00:00Z"));
        assert_eq!(events[1].summary, "Untitled Event");
        assert_eq!(events[1].start.as_deref(), Some("2026-03-04"));
        assert!(parse_events(&json!({})).is_empty());
    }

    #[test]
    fn summary_lists_events() {
        let day = Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap();
        assert!(summarize(day, &[]).ends_with("No events scheduled for today."));

        let events = parse_events(&json!({"items": [
            {"summary": "Standup", "start": {"dateTime": "09:00"}, "end": {"dateTime": "09:15"}, "location": "Room 1"}
        ]}));
        let text = summarize(day, &events);
        assert!(text.contains("You have 1 event(s) today"));
        assert!(text.contains("1. Standup"));
        assert!(text.contains("Time: 09:00 - 09:15"));
        assert!(text.contains("Location: Room 1"));
    }
}
