//! Capacity-bounded archive of past artifacts.
//!
//! The log is newest-first and never holds more than [`HISTORY_CAPACITY`]
//! entries; appending past the limit drops the oldest. The whole log is
//! persisted as one JSON array under [`HISTORY_STORAGE_KEY`].

#[cfg(feature = "desktop")]
pub mod commands;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::db::Database;
use crate::models::Artifact;

pub const HISTORY_CAPACITY: usize = 50;
pub const HISTORY_STORAGE_KEY: &str = "nanoLensHistoryV5";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryLog {
    items: Vec<Artifact>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a persisted blob. Anything unreadable yields an empty log.
    pub fn from_blob(blob: &str) -> Self {
        match serde_json::from_str::<Vec<Artifact>>(blob) {
            Ok(mut items) => {
                items.truncate(HISTORY_CAPACITY);
                Self { items }
            }
            Err(err) => {
                warn!("Discarding unreadable history blob: {err}");
                Self::default()
            }
        }
    }

    pub fn to_blob(&self) -> Result<String> {
        serde_json::to_string(&self.items).context("failed to serialize history")
    }

    /// Prepends `artifact` and returns how many old entries were evicted.
    ///
    /// An entry with the same id is replaced rather than duplicated, which
    /// moves it to the front.
    pub fn append(&mut self, artifact: Artifact) -> usize {
        self.items.retain(|item| item.id() != artifact.id());
        self.items.insert(0, artifact);
        let evicted = self.items.len().saturating_sub(HISTORY_CAPACITY);
        self.items.truncate(HISTORY_CAPACITY);
        evicted
    }

    pub fn remove(&mut self, id: &str) -> Option<Artifact> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    /// Replaces an existing entry in place. Returns `false` when the id is
    /// not archived.
    pub fn update(&mut self, artifact: Artifact) -> bool {
        match self.items.iter_mut().find(|item| item.id() == artifact.id()) {
            Some(slot) => {
                *slot = artifact;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Artifact> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn items(&self) -> &[Artifact] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// [`HistoryLog`] bound to its storage slot in the database.
pub struct HistoryStore {
    db: Database,
    log: HistoryLog,
}

impl HistoryStore {
    /// Reads the persisted log. A missing or corrupt blob, or a failing read,
    /// starts from an empty log.
    pub async fn load(db: Database) -> Self {
        let log = match db.get_value(HISTORY_STORAGE_KEY).await {
            Ok(Some(blob)) => HistoryLog::from_blob(&blob),
            Ok(None) => HistoryLog::new(),
            Err(err) => {
                warn!("History load failed, starting empty: {err:#}");
                HistoryLog::new()
            }
        };
        info!(
            "Loaded {} history entries from {}",
            log.len(),
            db.path().display()
        );

        Self { db, log }
    }

    pub async fn persist(&self) -> Result<()> {
        let blob = self.log.to_blob()?;
        self.db.put_value(HISTORY_STORAGE_KEY, blob).await
    }

    pub async fn append(&mut self, artifact: Artifact) -> Result<()> {
        let evicted = self.log.append(artifact);
        if evicted > 0 {
            info!("History full, evicted {evicted} oldest entries");
        }
        self.persist().await
    }

    pub async fn remove(&mut self, id: &str) -> Result<Option<Artifact>> {
        let removed = self.log.remove(id);
        if removed.is_some() {
            self.persist().await?;
        }
        Ok(removed)
    }

    pub async fn update(&mut self, artifact: Artifact) -> Result<bool> {
        let updated = self.log.update(artifact);
        if updated {
            self.persist().await?;
        }
        Ok(updated)
    }

    /// Records a chat exchange on an archived entry and returns the merged
    /// entry. `None` when the id is not archived.
    pub async fn record_exchange(
        &mut self,
        id: &str,
        question: &str,
        answer: &str,
    ) -> Result<Option<Artifact>> {
        let Some(mut entry) = self.log.get(id).cloned() else {
            return Ok(None);
        };
        entry.push_exchange(question, answer);
        self.update(entry.clone()).await?;
        Ok(Some(entry))
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.log.clear();
        self.persist().await
    }

    pub fn log(&self) -> &HistoryLog {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn artifact(tag: &str) -> Artifact {
        Artifact::from_payload(tag, "image/jpeg", Utc::now())
    }

    fn payloads(log: &HistoryLog) -> Vec<String> {
        log.items().iter().map(|a| a.raw_data().to_string()).collect()
    }

    #[test]
    fn fifty_one_appends_keep_the_fifty_most_recent() {
        let mut log = HistoryLog::new();
        let mut evicted = 0;
        for i in 0..51 {
            evicted += log.append(artifact(&format!("p{i}")));
            assert!(log.len() <= HISTORY_CAPACITY);
        }

        assert_eq!(evicted, 1);
        assert_eq!(log.len(), 50);
        let kept = payloads(&log);
        assert_eq!(kept.first().map(String::as_str), Some("p50"));
        assert_eq!(kept.last().map(String::as_str), Some("p1"));
        assert!(!kept.contains(&"p0".to_string()));
    }

    #[test]
    fn remove_preserves_relative_order() {
        let mut log = HistoryLog::new();
        let items: Vec<Artifact> = (0..5).map(|i| artifact(&format!("p{i}"))).collect();
        for item in &items {
            log.append(item.clone());
        }

        let removed = log.remove(items[2].id()).unwrap();
        assert_eq!(removed.raw_data(), "p2");
        assert_eq!(payloads(&log), vec!["p4", "p3", "p1", "p0"]);
        assert!(log.remove("missing").is_none());
    }

    #[test]
    fn reappending_moves_entry_to_front() {
        let mut log = HistoryLog::new();
        let first = artifact("a");
        log.append(first.clone());
        log.append(artifact("b"));
        log.append(first);
        assert_eq!(payloads(&log), vec!["a", "b"]);
    }

    #[test]
    fn update_replaces_in_place() {
        let mut log = HistoryLog::new();
        let mut target = artifact("a");
        log.append(target.clone());
        log.append(artifact("b"));

        target.push_exchange("q", "a");
        assert!(log.update(target.clone()));
        assert_eq!(log.items()[1], target);
        assert!(!log.update(artifact("c")));
    }

    #[test]
    fn corrupt_blob_yields_empty_log() {
        assert!(HistoryLog::from_blob("{not json").is_empty());
        assert!(HistoryLog::from_blob("{\"an\":\"object\"}").is_empty());
        assert!(HistoryLog::from_blob("").is_empty());
    }

    #[tokio::test]
    async fn store_round_trips_through_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("history.sqlite3")).unwrap();

        let mut store = HistoryStore::load(db.clone()).await;
        assert!(store.log().is_empty());
        store.append(artifact("x")).await.unwrap();
        store.append(artifact("y")).await.unwrap();

        let reloaded = HistoryStore::load(db).await;
        assert_eq!(payloads(reloaded.log()), vec!["y", "x"]);
    }

    #[tokio::test]
    async fn corrupt_persisted_blob_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("history.sqlite3")).unwrap();
        db.put_value(HISTORY_STORAGE_KEY, "[{\"broken\":".into())
            .await
            .unwrap();

        let store = HistoryStore::load(db).await;
        assert!(store.log().is_empty());
    }

    #[tokio::test]
    async fn exchanges_accumulate_on_the_archived_entry() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("history.sqlite3")).unwrap();
        let mut store = HistoryStore::load(db.clone()).await;
        let item = artifact("x");
        store.append(item.clone()).await.unwrap();

        store.record_exchange(item.id(), "q1", "a1").await.unwrap();
        let merged = store.record_exchange(item.id(), "q2", "a2").await.unwrap().unwrap();
        let texts: Vec<&str> = merged.conversation().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["q1", "a1", "q2", "a2"]);
        assert!(store.record_exchange("missing", "q", "a").await.unwrap().is_none());

        let reloaded = HistoryStore::load(db).await;
        assert_eq!(reloaded.log().get(item.id()).unwrap().conversation().len(), 4);
    }

    #[tokio::test]
    async fn clear_persists_an_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("history.sqlite3")).unwrap();
        let mut store = HistoryStore::load(db.clone()).await;
        store.append(artifact("x")).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(
            db.get_value(HISTORY_STORAGE_KEY).await.unwrap().as_deref(),
            Some("[]")
        );
    }
}
