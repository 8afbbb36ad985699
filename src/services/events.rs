//! Calendar Source — today's events for the brief.

use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::db::BriefDb;
use crate::google_api::calendar::{day_window, CalendarClient};
use crate::google_api::{GoogleApiError, TokenProvider, SCOPES};
use crate::types::CalendarEvent;

pub struct CalendarSource {
    calendar: Arc<dyn CalendarClient>,
    tokens: Arc<TokenProvider>,
    db: Arc<BriefDb>,
}

impl CalendarSource {
    pub fn new(
        calendar: Arc<dyn CalendarClient>,
        tokens: Arc<TokenProvider>,
        db: Arc<BriefDb>,
    ) -> Self {
        Self {
            calendar,
            tokens,
            db,
        }
    }

    /// Fetch today's events, start-ordered by the provider.
    pub async fn fetch_today(&self, user_id: &str) -> Vec<CalendarEvent> {
        self.fetch_for_day(user_id, Local::now()).await
    }

    /// Same as `fetch_today` with an injected local time for the day window.
    pub async fn fetch_for_day(&self, user_id: &str, now: DateTime<Local>) -> Vec<CalendarEvent> {
        let Some(token) = self.tokens.stored_token(user_id) else {
            log::warn!("No stored token for {}; skipping calendar fetch", user_id);
            return Vec::new();
        };

        let (time_min, time_max) = day_window(now);

        match self
            .calendar
            .list_events(&token, &time_min, &time_max)
            .await
        {
            Ok(events) => events,
            Err(GoogleApiError::AuthExpired) => {
                let Some(fresh) = self.tokens.refresh(SCOPES).await else {
                    return Vec::new();
                };
                if let Err(e) = self.db.save_access_token(user_id, &fresh) {
                    log::warn!("Failed to persist refreshed token: {}", e);
                }
                match self
                    .calendar
                    .list_events(&fresh, &time_min, &time_max)
                    .await
                {
                    Ok(events) => events,
                    Err(e) => {
                        log::warn!("Calendar fetch failed after refresh: {}", e);
                        Vec::new()
                    }
                }
            }
            Err(e) => {
                log::warn!("Calendar fetch failed: {}", e);
                Vec::new()
            }
        }
    }
}
