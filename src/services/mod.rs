//! Source services: fetch-and-normalize pipelines over the Google clients.
//!
//! Both sources share the same failure posture: a 401/403 triggers exactly
//! one token refresh (persisted to the profile record) and one retry; any
//! further failure degrades the source to an empty sequence. Errors never
//! propagate out of a source — the brief is assembled from whatever
//! succeeded.

pub mod emails;
pub mod events;

pub use emails::EmailSource;
pub use events::CalendarSource;
