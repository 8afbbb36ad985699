//! Day-keyed brief store: read-or-generate plus item completion toggle.

use std::sync::Arc;

use chrono::Local;

use crate::db::{BriefDb, DbError};
use crate::types::DailyBrief;

use super::AssembleBrief;

pub struct BriefStore {
    db: Arc<BriefDb>,
    assembler: Arc<dyn AssembleBrief>,
}

impl BriefStore {
    pub fn new(db: Arc<BriefDb>, assembler: Arc<dyn AssembleBrief>) -> Self {
        Self { db, assembler }
    }

    fn today() -> String {
        Local::now().format("%Y-%m-%d").to_string()
    }

    /// Return today's brief, assembling and persisting it only if absent.
    ///
    /// A stored brief is returned verbatim; assembly never runs twice for
    /// the same day through this path.
    pub async fn get_or_create(&self, user_id: &str) -> Result<DailyBrief, DbError> {
        self.get_or_create_for(user_id, &Self::today()).await
    }

    pub async fn get_or_create_for(
        &self,
        user_id: &str,
        date: &str,
    ) -> Result<DailyBrief, DbError> {
        if let Some(existing) = self.db.get_brief(user_id, date)? {
            return Ok(existing);
        }

        log::debug!("No brief stored for {} on {}; assembling", user_id, date);
        let mut brief = self.assembler.assemble(user_id).await;
        brief.id = date.to_string();
        self.db.put_brief(user_id, &brief)?;
        Ok(brief)
    }

    /// Flip the completed flag on one item of today's brief.
    ///
    /// A missing day-record is a silent no-op (`Ok(None)`); unknown item ids
    /// are a no-op that still rewrites the document. `completed_count` is
    /// recomputed from the items, never incremented.
    pub fn toggle_item(&self, user_id: &str, item_id: &str) -> Result<Option<DailyBrief>, DbError> {
        self.toggle_item_for(user_id, &Self::today(), item_id)
    }

    pub fn toggle_item_for(
        &self,
        user_id: &str,
        date: &str,
        item_id: &str,
    ) -> Result<Option<DailyBrief>, DbError> {
        let Some(mut brief) = self.db.get_brief(user_id, date)? else {
            log::debug!("No brief for {} on {}; toggle ignored", user_id, date);
            return Ok(None);
        };

        if let Some(item) = brief.items.iter_mut().find(|i| i.id == item_id) {
            item.completed = !item.completed;
        } else {
            log::debug!("Toggle for unknown item {} on {}", item_id, date);
        }

        brief.completed_count = brief.count_completed();
        self.db.put_brief(user_id, &brief)?;
        Ok(Some(brief))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BriefItem, ItemMetadata, ItemType};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAssembler {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AssembleBrief for CountingAssembler {
        async fn assemble(&self, _user_id: &str) -> DailyBrief {
            self.calls.fetch_add(1, Ordering::SeqCst);
            DailyBrief {
                id: String::new(),
                date: Utc::now(),
                summary: "Two items today.".to_string(),
                items: vec![
                    item("email-m1", ItemType::Email),
                    item("task-m1", ItemType::Task),
                ],
                completed_count: 0,
                total_count: 2,
                generated_at: Utc::now(),
            }
        }
    }

    fn item(id: &str, item_type: ItemType) -> BriefItem {
        BriefItem {
            id: id.to_string(),
            item_type,
            title: "x".to_string(),
            subtitle: String::new(),
            time: None,
            completed: false,
            priority: None,
            badge: None,
            metadata: ItemMetadata::default(),
            ai_draft: None,
        }
    }

    fn store() -> (tempfile::TempDir, Arc<CountingAssembler>, BriefStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(BriefDb::open_at(dir.path().join("t.db")).unwrap());
        let assembler = Arc::new(CountingAssembler {
            calls: AtomicUsize::new(0),
        });
        let store = BriefStore::new(db, assembler.clone());
        (dir, assembler, store)
    }

    #[tokio::test]
    async fn test_get_or_create_assembles_once() {
        let (_dir, assembler, store) = store();

        let first = store.get_or_create_for("u1", "2026-08-24").await.unwrap();
        assert_eq!(first.id, "2026-08-24");
        assert_eq!(first.total_count, 2);

        // The stored document comes back verbatim; no second assembly.
        let second = store.get_or_create_for("u1", "2026-08-24").await.unwrap();
        assert_eq!(second.items.len(), first.items.len());
        assert_eq!(assembler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_create_is_per_day() {
        let (_dir, assembler, store) = store();
        store.get_or_create_for("u1", "2026-08-24").await.unwrap();
        store.get_or_create_for("u1", "2026-08-25").await.unwrap();
        assert_eq!(assembler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_toggle_is_an_involution() {
        let (_dir, _assembler, store) = store();
        store.get_or_create_for("u1", "2026-08-24").await.unwrap();

        let once = store
            .toggle_item_for("u1", "2026-08-24", "email-m1")
            .unwrap()
            .unwrap();
        assert!(once.items[0].completed);
        assert_eq!(once.completed_count, 1);
        assert_eq!(once.total_count, 2);

        let twice = store
            .toggle_item_for("u1", "2026-08-24", "email-m1")
            .unwrap()
            .unwrap();
        assert!(!twice.items[0].completed);
        assert_eq!(twice.completed_count, 0);
        assert_eq!(twice.total_count, 2);
    }

    #[tokio::test]
    async fn test_toggle_unknown_id_is_noop() {
        let (_dir, _assembler, store) = store();
        store.get_or_create_for("u1", "2026-08-24").await.unwrap();

        let brief = store
            .toggle_item_for("u1", "2026-08-24", "email-nope")
            .unwrap()
            .unwrap();
        assert!(brief.items.iter().all(|i| !i.completed));
        assert_eq!(brief.completed_count, 0);
    }

    #[tokio::test]
    async fn test_toggle_recomputes_count_from_items() {
        let (_dir, _assembler, store) = store();
        store.get_or_create_for("u1", "2026-08-24").await.unwrap();

        store
            .toggle_item_for("u1", "2026-08-24", "email-m1")
            .unwrap();
        let brief = store
            .toggle_item_for("u1", "2026-08-24", "task-m1")
            .unwrap()
            .unwrap();
        assert_eq!(brief.completed_count, 2);
        assert_eq!(brief.completed_count, brief.count_completed());
    }

    #[tokio::test]
    async fn test_toggle_missing_brief_is_silent_noop() {
        let (_dir, assembler, store) = store();
        let result = store.toggle_item_for("u1", "2026-08-24", "x").unwrap();
        assert!(result.is_none());
        // Nothing was assembled or written as a side effect
        assert_eq!(assembler.calls.load(Ordering::SeqCst), 0);
    }
}
