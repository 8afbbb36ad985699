//! Application configuration and per-user settings.
//!
//! `AppConfig` lives at `~/.daybrief/config.json` and holds the OAuth client,
//! the completion API key, and the important-sender allowlist. `UserSettings`
//! is the per-user sub-record persisted alongside the profile; every field
//! carries a serde default so partial or stale stored records load cleanly —
//! unknown/missing fields are defaulted, never rejected.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// OAuth client id for the interactive consent flow.
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    /// API key for the hosted completion endpoint.
    pub gemini_api_key: Option<String>,
    /// Senders always included by the importance filter (substring match on
    /// the From header, case-insensitive).
    pub important_senders: Vec<String>,
    /// Profile row the CLI operates on.
    pub user_id: Option<String>,
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_default()
            .join(".daybrief")
            .join("config.json")
    }

    /// Load from disk, falling back to defaults when the file is absent or
    /// unreadable. A malformed file is logged and ignored rather than fatal.
    pub fn load() -> Self {
        let path = Self::config_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Ignoring malformed config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or("me")
    }
}

/// Per-user settings sub-record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub ai_summaries_enabled: bool,
    pub sync_email_to_calendar: bool,
    pub sync_calendar_to_email: bool,
    pub night_mode: bool,
    pub notifications_enabled: bool,
    /// "HH:MM" local time.
    pub morning_brief_time: String,
    pub evening_brief_enabled: bool,
    pub evening_brief_time: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            ai_summaries_enabled: true,
            sync_email_to_calendar: false,
            sync_calendar_to_email: false,
            night_mode: false,
            notifications_enabled: true,
            morning_brief_time: "08:00".to_string(),
            evening_brief_enabled: false,
            evening_brief_time: "21:00".to_string(),
        }
    }
}
