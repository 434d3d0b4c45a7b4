use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{EntryPredicate, LessonStore, StoreError, StoreStats};
use crate::cache::CacheEntry;
use crate::clock::{Clock, SystemClock};
use crate::fingerprint::Fingerprint;

/// Process-local store; contents are lost on restart
pub struct MemoryLessonStore {
  entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
  clock: Arc<dyn Clock>,
}

impl MemoryLessonStore {
  pub fn new() -> Self {
    Self::with_clock(Arc::new(SystemClock))
  }

  pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
    Self { entries: RwLock::new(HashMap::new()), clock }
  }
}

impl Default for MemoryLessonStore {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl LessonStore for MemoryLessonStore {
  async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>, StoreError> {
    let now = self.clock.now();
    let entries = self.entries.read().await;
    Ok(entries.get(fingerprint).filter(|entry| entry.expires_at > now).cloned())
  }

  async fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
    let now = self.clock.now();
    let mut entries = self.entries.write().await;

    let before = entries.len();
    entries.retain(|_, existing| existing.expires_at > now);
    if entries.len() < before {
      debug!(evicted = before - entries.len(), "dropped past-deadline entries");
    }

    entries.insert(entry.fingerprint.clone(), entry);
    Ok(())
  }

  async fn delete_where(&self, predicate: &EntryPredicate<'_>) -> Result<usize, StoreError> {
    let now = self.clock.now();
    let mut entries = self.entries.write().await;

    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now && !predicate(entry));
    Ok(before - entries.len())
  }

  /// Counts only entries a `get` would still return
  async fn stats(&self) -> Result<StoreStats, StoreError> {
    let now = self.clock.now();
    let entries = self.entries.read().await;
    let live: Vec<&CacheEntry> = entries.values().filter(|entry| entry.expires_at > now).collect();
    let size_bytes = live
      .iter()
      .map(|entry| serde_json::to_vec(entry).map_or(0, |bytes| bytes.len() as u64))
      .sum();
    Ok(StoreStats { entry_count: live.len(), size_bytes })
  }
}
