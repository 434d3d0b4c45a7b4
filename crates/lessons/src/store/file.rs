use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

use super::{EntryPredicate, LessonStore, StoreError, StoreStats};
use crate::cache::CacheEntry;
use crate::clock::{Clock, SystemClock};
use crate::fingerprint::Fingerprint;

const ENTRY_EXTENSION: &str = "json";

/// One JSON document per fingerprint under a directory
///
/// Writes go to a temporary sibling and are renamed into place, so readers
/// see either the old entry or the new one.
pub struct FileLessonStore {
  dir: PathBuf,
  clock: Arc<dyn Clock>,
  write_seq: AtomicU64,
}

impl FileLessonStore {
  pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
    Self::open_with_clock(dir, Arc::new(SystemClock)).await
  }

  pub async fn open_with_clock(
    dir: impl Into<PathBuf>,
    clock: Arc<dyn Clock>,
  ) -> Result<Self, StoreError> {
    let dir = dir.into();
    fs::create_dir_all(&dir).await?;
    debug!(dir = %dir.display(), "opened file lesson store");
    Ok(Self { dir, clock, write_seq: AtomicU64::new(0) })
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
    self.dir.join(format!("{}.{ENTRY_EXTENSION}", fingerprint.as_str()))
  }

  async fn read_entry(path: &Path) -> Result<Option<CacheEntry>, StoreError> {
    let bytes = match fs::read(path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&bytes)
      .map(Some)
      .map_err(|e| StoreError::corrupt(path, e.to_string()))
  }

  async fn entry_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
    let mut paths = Vec::new();
    let mut dir = fs::read_dir(&self.dir).await?;
    while let Some(item) = dir.next_entry().await? {
      let path = item.path();
      if path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION) {
        paths.push(path);
      }
    }
    Ok(paths)
  }
}

#[async_trait]
impl LessonStore for FileLessonStore {
  async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>, StoreError> {
    let now = self.clock.now();
    let entry = Self::read_entry(&self.entry_path(fingerprint)).await?;
    Ok(entry.filter(|entry| entry.expires_at > now))
  }

  async fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
    let path = self.entry_path(&entry.fingerprint);
    let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
    let tmp = self.dir.join(format!(".{}.{}.{seq}.tmp", entry.fingerprint.as_str(), std::process::id()));

    let bytes = serde_json::to_vec_pretty(&entry)?;
    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, &path).await {
      let _ = fs::remove_file(&tmp).await;
      return Err(e.into());
    }
    Ok(())
  }

  async fn delete_where(&self, predicate: &EntryPredicate<'_>) -> Result<usize, StoreError> {
    let now = self.clock.now();
    let mut removed = 0;

    for path in self.entry_paths().await? {
      let entry = match Self::read_entry(&path).await {
        Ok(Some(entry)) => entry,
        // Raced with another sweep
        Ok(None) => continue,
        Err(e) => {
          warn!(error = %e, "skipping unreadable cache entry during sweep");
          continue;
        }
      };

      if entry.expires_at <= now || predicate(&entry) {
        match fs::remove_file(&path).await {
          Ok(()) => removed += 1,
          Err(e) if e.kind() == ErrorKind::NotFound => {}
          Err(e) => return Err(e.into()),
        }
      }
    }

    Ok(removed)
  }

  async fn stats(&self) -> Result<StoreStats, StoreError> {
    let now = self.clock.now();
    let mut stats = StoreStats::default();
    for path in self.entry_paths().await? {
      let bytes = match fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => continue,
        Err(e) => return Err(e.into()),
      };
      match serde_json::from_slice::<CacheEntry>(&bytes) {
        Ok(entry) if entry.expires_at > now => {
          stats.entry_count += 1;
          stats.size_bytes += bytes.len() as u64;
        }
        Ok(_) => {}
        Err(e) => warn!(path = %path.display(), error = %e, "not counting unreadable cache entry"),
      }
    }
    Ok(stats)
  }
}
