//! Learner profile store
//!
//! Profiles are keyed by the caller-supplied user id. A POST replaces the
//! stored document wholesale; only the creation time survives an update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

/// Used when a request carries no `user-id` header
pub const DEFAULT_USER_ID: &str = "default-user";

#[derive(Error, Debug)]
pub enum ProfileError {
  #[error("Invalid user id: {0}")]
  InvalidUserId(String),

  #[error("Profile store I/O failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("Profile serialization failed: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Profile document as stored and returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredProfile {
  pub nationality: String,
  pub native_languages: Vec<String>,
  pub additional_languages: Vec<String>,
  pub proficiency_levels: Map<String, Value>,
  pub learning_history: Vec<Value>,
  pub progress_data: Value,
  pub created_at: DateTime<Utc>,
  pub last_activity: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Body of `POST /profile`; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
  #[serde(default)]
  pub nationality: Option<String>,
  #[serde(default)]
  pub native_languages: Option<Vec<String>>,
  #[serde(default)]
  pub additional_languages: Option<Vec<String>>,
  #[serde(default)]
  pub proficiency_levels: Option<Map<String, Value>>,
  #[serde(default)]
  pub learning_history: Option<Vec<Value>>,
  #[serde(default)]
  pub progress_data: Option<Value>,
}

fn empty_progress() -> Value {
  json!({
    "vocabulary": 0,
    "grammar": 0,
    "listening": 0,
    "speaking": 0,
    "reading": 0,
    "writing": 0
  })
}

impl ProfileUpdate {
  pub fn into_profile(self, now: DateTime<Utc>, existing: Option<&StoredProfile>) -> StoredProfile {
    StoredProfile {
      nationality: self.nationality.unwrap_or_default(),
      native_languages: self.native_languages.unwrap_or_default(),
      additional_languages: self.additional_languages.unwrap_or_default(),
      proficiency_levels: self.proficiency_levels.unwrap_or_default(),
      learning_history: self.learning_history.unwrap_or_default(),
      progress_data: self.progress_data.unwrap_or_else(empty_progress),
      created_at: existing.map_or(now, |profile| profile.created_at),
      last_activity: now,
      updated_at: now,
    }
  }
}

/// Ids become file names, so only a conservative alphabet is accepted
pub fn validate_user_id(user_id: &str) -> Result<(), ProfileError> {
  let valid = !user_id.is_empty()
    && user_id.len() <= 128
    && user_id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
    && !user_id.starts_with('.');
  if valid {
    Ok(())
  } else {
    Err(ProfileError::InvalidUserId(user_id.to_string()))
  }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
  async fn get(&self, user_id: &str) -> Result<Option<StoredProfile>, ProfileError>;

  async fn put(&self, user_id: &str, profile: StoredProfile) -> Result<(), ProfileError>;

  /// Replace the profile, keeping the first creation time
  async fn upsert(&self, user_id: &str, update: ProfileUpdate) -> Result<StoredProfile, ProfileError> {
    validate_user_id(user_id)?;
    let existing = self.get(user_id).await?;
    let profile = update.into_profile(Utc::now(), existing.as_ref());
    self.put(user_id, profile.clone()).await?;
    Ok(profile)
  }
}

#[derive(Default)]
pub struct MemoryProfileStore {
  profiles: RwLock<HashMap<String, StoredProfile>>,
}

impl MemoryProfileStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
  async fn get(&self, user_id: &str) -> Result<Option<StoredProfile>, ProfileError> {
    Ok(self.profiles.read().await.get(user_id).cloned())
  }

  async fn put(&self, user_id: &str, profile: StoredProfile) -> Result<(), ProfileError> {
    validate_user_id(user_id)?;
    self.profiles.write().await.insert(user_id.to_string(), profile);
    Ok(())
  }
}

/// One `<user-id>.json` document per profile
pub struct FileProfileStore {
  dir: PathBuf,
  write_seq: AtomicU64,
}

impl FileProfileStore {
  pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, ProfileError> {
    let dir = dir.into();
    fs::create_dir_all(&dir).await?;
    debug!(dir = %dir.display(), "opened file profile store");
    Ok(Self { dir, write_seq: AtomicU64::new(0) })
  }

  fn profile_path(&self, user_id: &str) -> Result<PathBuf, ProfileError> {
    validate_user_id(user_id)?;
    Ok(self.dir.join(format!("{user_id}.json")))
  }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
  async fn get(&self, user_id: &str) -> Result<Option<StoredProfile>, ProfileError> {
    let path = self.profile_path(user_id)?;
    match fs::read(&path).await {
      Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn put(&self, user_id: &str, profile: StoredProfile) -> Result<(), ProfileError> {
    let path = self.profile_path(user_id)?;
    let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
    let tmp = self.dir.join(format!(".{user_id}.{}.{seq}.tmp", std::process::id()));

    fs::write(&tmp, serde_json::to_vec_pretty(&profile)?).await?;
    if let Err(e) = fs::rename(&tmp, &path).await {
      let _ = fs::remove_file(&tmp).await;
      return Err(e.into());
    }
    Ok(())
  }
}
