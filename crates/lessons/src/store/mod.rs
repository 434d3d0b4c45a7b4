//! Persistence behind the lesson cache
//!
//! A [`LessonStore`] keeps [`CacheEntry`] values by fingerprint. Stores honour
//! each entry's physical deadline on their own: past-deadline entries are never
//! returned and are removed by any sweep, whatever predicate the sweep uses.
//! Freshness (the 24 hour window) is the cache's business, not the store's.

mod file;
mod memory;

pub use file::FileLessonStore;
pub use memory::MemoryLessonStore;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::CacheEntry;
use crate::fingerprint::Fingerprint;

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Lesson store unavailable: {message}")]
  Unavailable { message: String },

  #[error("Lesson store I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Lesson store serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Corrupt cache entry at {}: {message}", path.display())]
  Corrupt { path: PathBuf, message: String },
}

impl StoreError {
  pub fn unavailable(message: impl Into<String>) -> Self {
    Self::Unavailable { message: message.into() }
  }

  pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
    Self::Corrupt { path: path.into(), message: message.into() }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
  pub entry_count: usize,
  /// Approximate serialized size of all entries
  pub size_bytes: u64,
}

/// Selects entries for deletion
pub type EntryPredicate<'a> = dyn Fn(&CacheEntry) -> bool + Send + Sync + 'a;

#[async_trait]
pub trait LessonStore: Send + Sync {
  async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>, StoreError>;

  /// Insert or replace; last write wins
  async fn put(&self, entry: CacheEntry) -> Result<(), StoreError>;

  /// Remove matching (and past-deadline) entries, returning how many went
  async fn delete_where(&self, predicate: &EntryPredicate<'_>) -> Result<usize, StoreError>;

  async fn stats(&self) -> Result<StoreStats, StoreError>;
}
