//! Daily brief assembly.
//!
//! Item order is fixed: emails first, then calendar events, then tasks
//! derived from the retained emails. Nothing downstream re-sorts the list;
//! clients render it as stored.

use std::sync::Arc;

use chrono::{Local, Utc};

use crate::google_api::classify;
use crate::intelligence::{draft, summary, CompletionClient};
use crate::services::{CalendarSource, EmailSource};
use crate::types::{
    BriefItem, CalendarEvent, DailyBrief, EmailItem, ItemMetadata, ItemType,
};

/// Seam over brief assembly so the store can be tested without live sources.
#[async_trait::async_trait]
pub trait AssembleBrief: Send + Sync {
    async fn assemble(&self, user_id: &str) -> DailyBrief;
}

pub struct BriefAssembler {
    emails: EmailSource,
    events: CalendarSource,
    llm: Arc<dyn CompletionClient>,
}

impl BriefAssembler {
    pub fn new(emails: EmailSource, events: CalendarSource, llm: Arc<dyn CompletionClient>) -> Self {
        Self { emails, events, llm }
    }
}

#[async_trait::async_trait]
impl AssembleBrief for BriefAssembler {
    async fn assemble(&self, user_id: &str) -> DailyBrief {
        let (emails, events) = tokio::join!(
            self.emails.fetch_important(user_id),
            self.events.fetch_today(user_id),
        );

        let now = Utc::now();
        let mut items = Vec::with_capacity(emails.len() * 2 + events.len());

        // Drafts are generated one at a time; a slow provider degrades each
        // email to its fallback draft independently.
        for email in &emails {
            let ai_draft = draft::generate_draft(self.llm.as_ref(), email).await;
            items.push(email_item(email, ai_draft));
        }

        for event in &events {
            items.push(calendar_item(event));
        }

        for email in &emails {
            if let Some(item) = task_item(email) {
                items.push(item);
            }
        }

        let narrative = summary::generate_summary(self.llm.as_ref(), &emails, &events, now).await;

        let total_count = items.len();
        DailyBrief {
            id: Local::now().format("%Y-%m-%d").to_string(),
            date: now,
            summary: narrative,
            items,
            completed_count: 0,
            total_count,
            generated_at: now,
        }
    }
}

fn email_item(email: &EmailItem, ai_draft: crate::types::EmailDraft) -> BriefItem {
    BriefItem {
        id: format!("email-{}", email.id),
        item_type: ItemType::Email,
        title: email.subject.clone(),
        subtitle: email.snippet.clone(),
        time: None,
        completed: false,
        priority: Some(email.priority),
        badge: None,
        metadata: ItemMetadata {
            from: Some(email.from.clone()),
            email_id: Some(email.id.clone()),
            snippet: Some(email.snippet.clone()),
            ..Default::default()
        },
        ai_draft: Some(ai_draft),
    }
}

fn calendar_item(event: &CalendarEvent) -> BriefItem {
    BriefItem {
        id: format!("calendar-{}", event.id),
        item_type: ItemType::Calendar,
        title: event.title.clone(),
        subtitle: event.description.clone(),
        time: Some(event.display_time()),
        completed: false,
        priority: None,
        badge: None,
        metadata: ItemMetadata {
            location: (!event.location.is_empty()).then(|| event.location.clone()),
            description: (!event.description.is_empty()).then(|| event.description.clone()),
            ..Default::default()
        },
        ai_draft: None,
    }
}

/// Derive a task item from a retained email, if a badge class matches.
fn task_item(email: &EmailItem) -> Option<BriefItem> {
    let badge = classify::derive_badge(&email.subject, &email.snippet)?;
    Some(BriefItem {
        id: format!("task-{}", email.id),
        item_type: ItemType::Task,
        title: email.subject.clone(),
        subtitle: email.from.clone(),
        time: None,
        completed: false,
        priority: Some(email.priority),
        badge: Some(badge),
        metadata: ItemMetadata {
            email_id: Some(email.id.clone()),
            ..Default::default()
        },
        ai_draft: None,
    })
}
