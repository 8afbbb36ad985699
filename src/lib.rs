//! daybrief — personal daily-brief pipeline over Gmail and Google Calendar.
//!
//! The pipeline fetches important emails and today's events, generates reply
//! drafts and a narrative summary, and persists one brief document per user
//! per calendar day. See `brief::BriefStore` for the entry points.

pub mod autosend;
pub mod brief;
pub mod config;
pub mod db;
pub mod error;
pub mod google_api;
pub mod intelligence;
pub mod services;
pub mod types;
