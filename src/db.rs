//! SQLite-backed persistence for profiles, settings, and daily briefs.
//!
//! The database lives at `~/.daybrief/daybrief.db`. Briefs are stored as
//! whole JSON documents keyed by (user_id, date) — the document model the
//! brief store's read-or-generate and toggle operations round-trip through.
//! There is no optimistic concurrency on the brief document: toggle and
//! re-generation both perform an unprotected read-modify-write, and the
//! last writer wins.

use std::path::PathBuf;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;

use crate::config::UserSettings;
use crate::types::DailyBrief;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Stored document is malformed: {0}")]
    Document(#[from] serde_json::Error),
}

/// A row from the `users` table — the user profile record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub updated_at: String,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    email         TEXT,
    display_name  TEXT,
    photo_url     TEXT,
    access_token  TEXT,
    refresh_token TEXT,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    user_id    TEXT PRIMARY KEY,
    document   TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS briefs (
    user_id      TEXT NOT NULL,
    date         TEXT NOT NULL,
    document     TEXT NOT NULL,
    generated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, date)
);
";

/// SQLite connection wrapper.
///
/// The connection sits behind a non-poisoning mutex so the store can be
/// shared across async tasks; individual operations are short and never
/// hold the lock across an await point.
pub struct BriefDb {
    conn: Mutex<Connection>,
}

impl BriefDb {
    /// Open (or create) the database at `~/.daybrief/daybrief.db`.
    pub fn open() -> Result<Self, DbError> {
        Self::open_at(Self::db_path()?)
    }

    /// Open a database at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        // All statements use IF NOT EXISTS, so re-opening is idempotent.
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".daybrief").join("daybrief.db"))
    }

    // =========================================================================
    // User profiles
    // =========================================================================

    pub fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, DbError> {
        let conn = self.conn.lock();
        let profile = conn
            .query_row(
                "SELECT id, email, display_name, photo_url, access_token, refresh_token, updated_at
                 FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(UserProfile {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        display_name: row.get(2)?,
                        photo_url: row.get(3)?,
                        access_token: row.get(4)?,
                        refresh_token: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    /// Insert or update the profile identity fields, leaving tokens alone.
    pub fn upsert_user(
        &self,
        user_id: &str,
        email: Option<&str>,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, email, display_name, photo_url, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
               email = COALESCE(excluded.email, users.email),
               display_name = COALESCE(excluded.display_name, users.display_name),
               photo_url = COALESCE(excluded.photo_url, users.photo_url),
               updated_at = excluded.updated_at",
            params![user_id, email, display_name, photo_url, now],
        )?;
        Ok(())
    }

    /// Persist a fresh access token on the profile record.
    ///
    /// Concurrent refreshes both land here; the later write wins.
    pub fn save_access_token(&self, user_id: &str, access_token: &str) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, access_token, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
               access_token = excluded.access_token,
               updated_at = excluded.updated_at",
            params![user_id, access_token, now],
        )?;
        Ok(())
    }

    pub fn save_refresh_token(&self, user_id: &str, refresh_token: &str) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, refresh_token, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
               refresh_token = excluded.refresh_token,
               updated_at = excluded.updated_at",
            params![user_id, refresh_token, now],
        )?;
        Ok(())
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Load settings, defaulting any missing record or missing fields.
    pub fn get_settings(&self, user_id: &str) -> Result<UserSettings, DbError> {
        let conn = self.conn.lock();
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM settings WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        match document {
            Some(doc) => Ok(serde_json::from_str(&doc)?),
            None => Ok(UserSettings::default()),
        }
    }

    pub fn save_settings(&self, user_id: &str, settings: &UserSettings) -> Result<(), DbError> {
        let document = serde_json::to_string(settings)?;
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO settings (user_id, document, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
               document = excluded.document,
               updated_at = excluded.updated_at",
            params![user_id, document, now],
        )?;
        Ok(())
    }

    // =========================================================================
    // Briefs
    // =========================================================================

    pub fn get_brief(&self, user_id: &str, date: &str) -> Result<Option<DailyBrief>, DbError> {
        let conn = self.conn.lock();
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM briefs WHERE user_id = ?1 AND date = ?2",
                params![user_id, date],
                |row| row.get(0),
            )
            .optional()?;

        match document {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    /// Write the whole brief document, replacing any existing one for the day.
    pub fn put_brief(&self, user_id: &str, brief: &DailyBrief) -> Result<(), DbError> {
        let document = serde_json::to_string(brief)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO briefs (user_id, date, document, generated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, date) DO UPDATE SET
               document = excluded.document,
               generated_at = excluded.generated_at",
            params![user_id, brief.id, document, brief.generated_at.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BriefItem, ItemMetadata, ItemType};

    fn test_db() -> (tempfile::TempDir, BriefDb) {
        let dir = tempfile::tempdir().unwrap();
        let db = BriefDb::open_at(dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn sample_brief(date: &str) -> DailyBrief {
        DailyBrief {
            id: date.to_string(),
            date: Utc::now(),
            summary: "Quiet day.".to_string(),
            items: vec![BriefItem {
                id: "email-m1".to_string(),
                item_type: ItemType::Email,
                title: "Hello".to_string(),
                subtitle: "".to_string(),
                time: None,
                completed: false,
                priority: None,
                badge: None,
                metadata: ItemMetadata::default(),
                ai_draft: None,
            }],
            completed_count: 0,
            total_count: 1,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_token_roundtrip() {
        let (_dir, db) = test_db();
        db.upsert_user("u1", Some("u@example.com"), Some("U"), None)
            .unwrap();
        db.save_access_token("u1", "ya29.first").unwrap();
        db.save_access_token("u1", "ya29.second").unwrap();

        let profile = db.get_user("u1").unwrap().unwrap();
        assert_eq!(profile.email.as_deref(), Some("u@example.com"));
        assert_eq!(profile.access_token.as_deref(), Some("ya29.second"));
    }

    #[test]
    fn test_save_token_for_unknown_user_creates_row() {
        let (_dir, db) = test_db();
        db.save_access_token("fresh", "tok").unwrap();
        let profile = db.get_user("fresh").unwrap().unwrap();
        assert_eq!(profile.access_token.as_deref(), Some("tok"));
        assert!(profile.email.is_none());
    }

    #[test]
    fn test_settings_default_when_absent() {
        let (_dir, db) = test_db();
        let settings = db.get_settings("u1").unwrap();
        assert_eq!(settings, UserSettings::default());
    }

    #[test]
    fn test_settings_roundtrip() {
        let (_dir, db) = test_db();
        let mut settings = UserSettings::default();
        settings.night_mode = true;
        settings.morning_brief_time = "06:45".to_string();
        db.save_settings("u1", &settings).unwrap();

        let loaded = db.get_settings("u1").unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_brief_roundtrip_and_overwrite() {
        let (_dir, db) = test_db();
        assert!(db.get_brief("u1", "2026-08-24").unwrap().is_none());

        let brief = sample_brief("2026-08-24");
        db.put_brief("u1", &brief).unwrap();
        let loaded = db.get_brief("u1", "2026-08-24").unwrap().unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.total_count, 1);

        // Whole-document overwrite
        let mut updated = loaded;
        updated.items[0].completed = true;
        updated.completed_count = 1;
        db.put_brief("u1", &updated).unwrap();
        let reloaded = db.get_brief("u1", "2026-08-24").unwrap().unwrap();
        assert_eq!(reloaded.completed_count, 1);
    }

    #[test]
    fn test_briefs_keyed_per_user_and_day() {
        let (_dir, db) = test_db();
        db.put_brief("u1", &sample_brief("2026-08-24")).unwrap();
        db.put_brief("u2", &sample_brief("2026-08-24")).unwrap();
        db.put_brief("u1", &sample_brief("2026-08-25")).unwrap();

        assert!(db.get_brief("u1", "2026-08-24").unwrap().is_some());
        assert!(db.get_brief("u2", "2026-08-25").unwrap().is_none());
    }
}
