//! Time-bounded lesson cache
//!
//! Entries are served for 24 hours after creation and physically retained for
//! 7 days. Anything in between may still sit in the store but is never
//! returned by [`LessonCache::get`].

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::content::GeneratedLesson;
use crate::fingerprint::Fingerprint;
use crate::model::{LearnerProfile, LessonRequest};
use crate::store::{LessonStore, StoreError, StoreStats};

/// How long an entry is served
pub fn freshness_window() -> Duration {
  Duration::hours(24)
}

/// How long an entry is physically kept
pub fn retention_period() -> Duration {
  Duration::days(7)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
  pub fingerprint: Fingerprint,
  pub lesson: GeneratedLesson,
  pub user_profile: LearnerProfile,
  pub lesson_request: LessonRequest,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
  pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
    now - self.created_at <= freshness_window()
  }
}

#[derive(Clone)]
pub struct LessonCache {
  store: Arc<dyn LessonStore>,
  clock: Arc<dyn Clock>,
}

impl LessonCache {
  pub fn new(store: Arc<dyn LessonStore>) -> Self {
    Self::with_clock(store, Arc::new(SystemClock))
  }

  pub fn with_clock(store: Arc<dyn LessonStore>, clock: Arc<dyn Clock>) -> Self {
    Self { store, clock }
  }

  /// Current time as the cache sees it
  pub fn now(&self) -> DateTime<Utc> {
    self.clock.now()
  }

  /// Fresh entry for the fingerprint, if any. Never modifies the store.
  pub async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>, StoreError> {
    let now = self.clock.now();
    let entry = self.store.get(fingerprint).await?;

    match entry {
      Some(entry) if entry.is_fresh(now) => Ok(Some(entry)),
      Some(entry) => {
        debug!(%fingerprint, created_at = %entry.created_at, "cached lesson is stale");
        Ok(None)
      }
      None => Ok(None),
    }
  }

  pub async fn put(
    &self,
    fingerprint: &Fingerprint,
    lesson: &GeneratedLesson,
    profile: &LearnerProfile,
    request: &LessonRequest,
  ) -> Result<CacheEntry, StoreError> {
    let now = self.clock.now();
    let entry = CacheEntry {
      fingerprint: fingerprint.clone(),
      lesson: lesson.clone(),
      user_profile: profile.clone(),
      lesson_request: request.clone(),
      created_at: now,
      expires_at: now + retention_period(),
    };

    self.store.put(entry.clone()).await?;
    debug!(%fingerprint, "lesson cached");
    Ok(entry)
  }

  /// Delete every entry older than the freshness window
  pub async fn sweep_expired(&self) -> Result<usize, StoreError> {
    let cutoff = self.clock.now() - freshness_window();
    let removed = self.store.delete_where(&|entry: &CacheEntry| entry.created_at < cutoff).await?;

    if removed > 0 {
      info!(removed, "swept expired lessons");
    }
    Ok(removed)
  }

  pub async fn stats(&self) -> Result<StoreStats, StoreError> {
    self.store.stats().await
  }
}
