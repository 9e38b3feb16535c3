//! Clipboard history store - bounded history persisted in a key-value backend.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::models::{AddOutcome, HistoryList, PromoteOutcome};

use super::kv_store::KeyValueStore;

/// Backend key holding the history list.
pub const LIST_KEY: &str = "list";

/// Service owning the persisted clipboard history.
///
/// Every mutation is a load, modify, save round trip against the backend.
/// Round trips are serialized per store so concurrent capture triggers in
/// the same process cannot overwrite each other.
pub struct ClipboardHistoryStore {
    backend: Arc<dyn KeyValueStore>,
    capacity: usize,
    write_lock: Mutex<()>,
    /// Bumped after every persisted change.
    revision: watch::Sender<u64>,
}

impl ClipboardHistoryStore {
    /// Create a store over `backend` keeping at most `capacity` entries.
    pub fn new(backend: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            backend,
            capacity,
            write_lock: Mutex::new(()),
            revision,
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// All entries, most recent first. Empty if nothing was stored yet.
    pub async fn read_all(&self) -> StoreResult<Vec<String>> {
        Ok(self.load().await?.into_entries())
    }

    /// Add captured text without reordering existing entries.
    pub async fn add(&self, text: &str) -> StoreResult<AddOutcome> {
        if text.is_empty() {
            return Ok(AddOutcome::Ignored);
        }

        let _guard = self.write_lock.lock().await;
        let mut list = self.load().await?;
        let outcome = list.add(text);

        match &outcome {
            AddOutcome::Inserted { evicted } => {
                self.save(list).await?;
                if let Some(evicted) = evicted {
                    debug!(chars = evicted.chars().count(), "evicted oldest entry");
                }
                debug!(len = text.chars().count(), "added entry");
            }
            AddOutcome::Duplicate => debug!("entry already in history"),
            AddOutcome::Ignored => {}
        }

        Ok(outcome)
    }

    /// Move text to the front, inserting it if missing.
    pub async fn promote(&self, text: &str) -> StoreResult<PromoteOutcome> {
        if text.is_empty() {
            return Ok(PromoteOutcome::Ignored);
        }

        let _guard = self.write_lock.lock().await;
        let mut list = self.load().await?;
        let outcome = list.promote(text);
        self.save(list).await?;
        debug!(?outcome, "promoted entry");

        Ok(outcome)
    }

    /// Remove text from the history. Returns whether it was present.
    pub async fn remove(&self, text: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut list = self.load().await?;
        let removed = list.remove(text);
        self.save(list).await?;
        debug!(?removed, "removed entry");

        Ok(removed.is_some())
    }

    /// Drop every entry.
    pub async fn clear(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.save(HistoryList::new(self.capacity)).await?;
        debug!("cleared history");
        Ok(())
    }

    async fn load(&self) -> StoreResult<HistoryList> {
        let entries = match self.backend.get(LIST_KEY).await? {
            Some(value) => serde_json::from_value::<Vec<String>>(value).map_err(|source| {
                StoreError::Malformed {
                    key: LIST_KEY.to_string(),
                    source,
                }
            })?,
            None => Vec::new(),
        };
        Ok(HistoryList::from_entries(entries, self.capacity))
    }

    async fn save(&self, list: HistoryList) -> StoreResult<()> {
        let value = serde_json::Value::from(list.into_entries());
        self.backend.set(LIST_KEY, value).await?;
        self.revision.send_modify(|rev| *rev += 1);
        Ok(())
    }
}
