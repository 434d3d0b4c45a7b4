//! Content-addressed cache keys
//!
//! A fingerprint is the first 16 hex characters of the SHA-256 of a canonical
//! JSON object built from the profile, the request and the normalized
//! priorities. Keys are sorted at every level so logically equal inputs hash
//! the same regardless of field or list order.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::model::{LearnerProfile, LessonRequest};
use crate::priorities::PriorityProfile;

pub const FINGERPRINT_LEN: usize = 16;

/// Proficiency recorded in the key when the request carries none
const UNSET_PROFICIENCY: &str = "beginner";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Accepts only lowercase hex of the expected length
  pub fn parse(value: &str) -> Option<Self> {
    let well_formed = value.len() == FINGERPRINT_LEN
      && value.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    well_formed.then(|| Self(value.to_string()))
  }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Derive the cache key for a lesson; pure and deterministic
pub fn derive_key(
  profile: &LearnerProfile,
  request: &LessonRequest,
  priorities: &PriorityProfile,
) -> Fingerprint {
  let canonical = sort_keys(canonical_key_object(profile, request, priorities));
  // Serializing a Value cannot fail
  let serialized = serde_json::to_string(&canonical).unwrap_or_default();

  let digest = Sha256::digest(serialized.as_bytes());
  let mut hex = hex::encode(digest);
  hex.truncate(FINGERPRINT_LEN);
  Fingerprint(hex)
}

/// The object that gets hashed, before key sorting
pub fn canonical_key_object(
  profile: &LearnerProfile,
  request: &LessonRequest,
  priorities: &PriorityProfile,
) -> Value {
  let mut additional = profile.additional_languages.clone();
  additional.sort();

  let sorted = |items: &[String]| {
    let mut items = items.to_vec();
    items.sort();
    items
  };

  json!({
    "nativeLanguages": profile.native_languages,
    "nationality": profile.nationality,
    "learningStyle": profile.learning_style.as_str(),
    "additionalLanguages": additional,
    "targetLanguage": request.target_language,
    "contextualUse": serde_json::to_value(&request.contextual_use).unwrap_or(Value::Null),
    "topic": request.topic,
    "proficiencyLevel": request
      .proficiency_level
      .map(|level| level.as_str())
      .unwrap_or(UNSET_PROFICIENCY),
    "priorities": {
      "mustHave": sorted(&priorities.must_have),
      "shouldHave": sorted(&priorities.should_have),
      "couldHave": sorted(&priorities.could_have),
    },
  })
}

/// Rebuild every object with its keys in lexicographic order
fn sort_keys(value: Value) -> Value {
  match value {
    Value::Object(map) => {
      let mut entries: Vec<(String, Value)> = map.into_iter().collect();
      entries.sort_by(|a, b| a.0.cmp(&b.0));
      let mut sorted = Map::new();
      for (key, value) in entries {
        sorted.insert(key, sort_keys(value));
      }
      Value::Object(sorted)
    }
    Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
    other => other,
  }
}
