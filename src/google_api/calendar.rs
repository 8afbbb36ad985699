//! Google Calendar API v3 — today's events.
//!
//! Queries the primary calendar for single, expanded events inside a local
//! day window, ordered by start time, and maps them to the internal shape.

use chrono::{DateTime, Datelike, Local, NaiveDate, Offset, TimeZone, Utc};
use serde::Deserialize;

use super::GoogleApiError;
use crate::types::CalendarEvent;

const CALENDAR_EVENTS_URL: &str =
    "https://www.googleapis.com/calendar/v3/calendars/primary/events";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<EventRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRaw {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    start: Option<EventDateTime>,
    end: Option<EventDateTime>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: Option<String>,
    date: Option<String>,
}

// ============================================================================
// Calendar client seam
// ============================================================================

#[async_trait::async_trait]
pub trait CalendarClient: Send + Sync {
    /// List single, expanded events in [time_min, time_max), start-ordered.
    async fn list_events(
        &self,
        access_token: &str,
        time_min: &str,
        time_max: &str,
    ) -> Result<Vec<CalendarEvent>, GoogleApiError>;
}

pub struct GoogleCalendarClient {
    http: reqwest::Client,
}

impl GoogleCalendarClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for GoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn list_events(
        &self,
        access_token: &str,
        time_min: &str,
        time_max: &str,
    ) -> Result<Vec<CalendarEvent>, GoogleApiError> {
        let resp = self
            .http
            .get(CALENDAR_EVENTS_URL)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min),
                ("timeMax", time_max),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GoogleApiError::AuthExpired);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GoogleApiError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: EventListResponse = resp.json().await?;
        Ok(body.items.into_iter().filter_map(normalize_event).collect())
    }
}

// ============================================================================
// Normalization
// ============================================================================

fn normalize_event(item: EventRaw) -> Option<CalendarEvent> {
    if item.status.as_deref() == Some("cancelled") {
        return None;
    }

    let start_raw = item
        .start
        .as_ref()
        .and_then(|s| s.date_time.as_deref().or(s.date.as_deref()))
        .unwrap_or("");
    let end_raw = item
        .end
        .as_ref()
        .and_then(|s| s.date_time.as_deref().or(s.date.as_deref()))
        .unwrap_or("");

    let start = parse_event_datetime(start_raw)?;
    let end = parse_event_datetime(end_raw).unwrap_or(start);

    let is_all_day = item
        .start
        .as_ref()
        .map(|s| s.date_time.is_none() && s.date.is_some())
        .unwrap_or(false);

    Some(CalendarEvent {
        id: item.id,
        title: item.summary.unwrap_or_else(|| "Untitled Event".to_string()),
        start,
        end,
        description: item.description.unwrap_or_default(),
        location: item.location.unwrap_or_default(),
        is_all_day,
    })
}

/// Parse an event datetime string to UTC.
///
/// Full datetimes are RFC 3339; date-only values (all-day events) are taken
/// as local midnight for that date.
pub fn parse_event_datetime(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if s.contains('T') {
        DateTime::parse_from_rfc3339(&s.replace('Z', "+00:00"))
            .or_else(|_| DateTime::parse_from_rfc3339(s))
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    } else {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
        let midnight = date.and_hms_opt(0, 0, 0)?;
        Local
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Compute the [local midnight, next local midnight) query window for the
/// day containing `now`, as RFC 3339 strings carrying the local UTC offset.
///
/// Local-midnight bounds, not UTC midnight — on an evening in a western
/// timezone, UTC midnight is already tomorrow.
pub fn day_window(now: DateTime<Local>) -> (String, String) {
    let offset_secs = now.offset().fix().local_minus_utc();
    let offset_str = format!(
        "{:+03}:{:02}",
        offset_secs / 3600,
        (offset_secs.unsigned_abs() % 3600) / 60
    );

    let today = now.date_naive();
    let tomorrow = today + chrono::Duration::days(1);
    (
        format!(
            "{:04}-{:02}-{:02}T00:00:00{}",
            today.year(),
            today.month(),
            today.day(),
            offset_str
        ),
        format!(
            "{:04}-{:02}-{:02}T00:00:00{}",
            tomorrow.year(),
            tomorrow.month(),
            tomorrow.day(),
            offset_str
        ),
    )
}
