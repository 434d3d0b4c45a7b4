//! MoSCoW priority extraction, cleaning and time allocation
//!
//! Priorities can come from three places on a request. Each source is an
//! extractor function; [`extract_priorities`] runs them in order and keeps the
//! first that yields something. [`validate_priorities`] then turns the raw,
//! loosely-typed lists into a [`PriorityProfile`] that is never empty, and
//! [`compute_time_allocation`] derives the lesson-time split from it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{classify, LessonError, Recovery};
use crate::model::{LessonRequest, UseType};

/// Upper bound on entries kept per MoSCoW category
pub const MAX_PRIORITIES_PER_CATEGORY: usize = 10;

// Types
// =====

/// Priority lists as they arrive on the wire: anything JSON can express
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawPriorities {
  #[serde(default)]
  pub must_have: Value,
  #[serde(default)]
  pub should_have: Value,
  #[serde(default)]
  pub could_have: Value,
  #[serde(default)]
  pub wont_have: Value,
}

impl RawPriorities {
  /// A source counts only if one of must/should/could carries something
  pub fn is_trivial(&self) -> bool {
    !(is_truthy(&self.must_have) || is_truthy(&self.should_have) || is_truthy(&self.could_have))
  }

  fn from_lists(must: &[&str], should: &[&str], could: &[&str]) -> Self {
    let list = |items: &[&str]| Value::from(items.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    Self {
      must_have: list(must),
      should_have: list(should),
      could_have: list(could),
      wont_have: Value::Array(Vec::new()),
    }
  }
}

/// Cleaned MoSCoW lists: trimmed, non-empty strings, at most ten per list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriorityProfile {
  pub must_have: Vec<String>,
  pub should_have: Vec<String>,
  pub could_have: Vec<String>,
  pub wont_have: Vec<String>,
}

impl PriorityProfile {
  /// Substituted whenever cleaning leaves every list empty
  pub fn balanced_default() -> Self {
    Self {
      must_have: strings(&["Core vocabulary", "Basic grammar"]),
      should_have: strings(&["Pronunciation practice", "Cultural context"]),
      could_have: Vec::new(),
      wont_have: Vec::new(),
    }
  }

  /// Smallest useful profile, used for simplified retries
  pub fn minimal_default() -> Self {
    Self {
      must_have: strings(&["Core vocabulary"]),
      should_have: strings(&["Basic grammar"]),
      could_have: Vec::new(),
      wont_have: Vec::new(),
    }
  }

  pub fn total(&self) -> usize {
    self.must_have.len() + self.should_have.len() + self.could_have.len() + self.wont_have.len()
  }

  pub fn is_empty(&self) -> bool {
    self.total() == 0
  }

  /// Back to the wire shape, e.g. to pin priorities on an augmented request
  pub fn to_raw(&self) -> RawPriorities {
    RawPriorities {
      must_have: Value::from(self.must_have.clone()),
      should_have: Value::from(self.should_have.clone()),
      could_have: Value::from(self.could_have.clone()),
      wont_have: Value::from(self.wont_have.clone()),
    }
  }
}

/// Share of lesson time per category, in percent; always sums to 100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeAllocation {
  pub must_have: u32,
  pub should_have: u32,
  pub could_have: u32,
  pub buffer: u32,
}

impl TimeAllocation {
  /// Used when the weights cannot be normalized
  pub const FALLBACK: TimeAllocation =
    TimeAllocation { must_have: 70, should_have: 20, could_have: 10, buffer: 0 };

  pub fn total(&self) -> u32 {
    self.must_have + self.should_have + self.could_have + self.buffer
  }
}

// Extraction
// ==========

type Extractor = fn(&LessonRequest) -> Option<RawPriorities>;

/// Priority sources in precedence order
const EXTRACTORS: [(&str, Extractor); 3] = [
  ("phase", from_phase_priorities),
  ("user", from_user_priorities),
  ("contextual-use", from_contextual_use),
];

/// Pick the first non-trivial priority source on the request
pub fn extract_priorities(request: &LessonRequest) -> RawPriorities {
  for (source, extractor) in EXTRACTORS {
    if let Some(raw) = extractor(request) {
      debug!(source, "priorities extracted");
      return raw;
    }
  }

  debug!("no priority source on request");
  RawPriorities::default()
}

fn from_phase_priorities(request: &LessonRequest) -> Option<RawPriorities> {
  request.phase_priorities.as_ref().filter(|raw| !raw.is_trivial()).cloned()
}

fn from_user_priorities(request: &LessonRequest) -> Option<RawPriorities> {
  request.user_priorities.as_ref().filter(|raw| !raw.is_trivial()).cloned()
}

fn from_contextual_use(request: &LessonRequest) -> Option<RawPriorities> {
  let contextual = &request.contextual_use;
  if !contextual.priority_scale.as_ref().is_some_and(is_truthy) {
    return None;
  }

  let raw = match contextual.use_type {
    Some(UseType::Professional) => RawPriorities::from_lists(
      &["Professional communication", "Core vocabulary", "Grammar fundamentals"],
      &["Business terminology", "Formal writing", "Pronunciation practice"],
      &["Cultural context", "Casual conversation"],
    ),
    Some(UseType::Personal) => RawPriorities::from_lists(
      &["Basic conversation", "Core vocabulary", "Pronunciation practice"],
      &["Cultural context", "Travel phrases", "Grammar fundamentals"],
      &["Professional communication", "Formal writing"],
    ),
    _ => RawPriorities::from_lists(
      &["Core vocabulary", "Basic grammar"],
      &["Pronunciation practice", "Basic conversation"],
      &["Cultural context", "Professional communication"],
    ),
  };
  Some(raw)
}

// Validation
// ==========

/// Clean every category and guarantee at least one priority overall
pub fn validate_priorities(raw: &RawPriorities) -> PriorityProfile {
  let validated = PriorityProfile {
    must_have: clean_category(&raw.must_have),
    should_have: clean_category(&raw.should_have),
    could_have: clean_category(&raw.could_have),
    wont_have: clean_category(&raw.wont_have),
  };

  if validated.is_empty() {
    debug!("no usable priorities, substituting balanced defaults");
    return PriorityProfile::balanced_default();
  }

  validated
}

/// Extract then validate; what the orchestrator calls
pub fn normalize_priorities(request: &LessonRequest) -> PriorityProfile {
  validate_priorities(&extract_priorities(request))
}

fn clean_category(value: &Value) -> Vec<String> {
  let Value::Array(items) = value else {
    return Vec::new();
  };

  items
    .iter()
    .filter_map(Value::as_str)
    .map(str::trim)
    .filter(|item| !item.is_empty())
    .take(MAX_PRIORITIES_PER_CATEGORY)
    .map(str::to_string)
    .collect()
}

// Time Allocation
// ===============

/// Weight the categories by list length and rescale to exactly 100
///
/// Shares are floored and the leftover points handed out one at a time to
/// the largest remainders, ties going to the earlier category
/// (mustHave, shouldHave, couldHave, buffer). When rounding half-up already
/// totals 100 this gives the same numbers.
pub fn compute_time_allocation(profile: &PriorityProfile) -> TimeAllocation {
  let should = count(profile.should_have.len());
  let could = count(profile.could_have.len());

  let weights = [
    80u32.saturating_sub(should.saturating_mul(5)).max(60),
    should.saturating_mul(8).min(30),
    could.saturating_mul(3).min(15),
    10,
  ];

  match scale_to_percent(weights) {
    Ok([must_have, should_have, could_have, buffer]) => {
      TimeAllocation { must_have, should_have, could_have, buffer }
    }
    Err(e) => {
      debug_assert_eq!(classify(&e), Recovery::WithDefault);
      warn!(error = %e, "time allocation fell back to defaults");
      TimeAllocation::FALLBACK
    }
  }
}

fn scale_to_percent(weights: [u32; 4]) -> Result<[u32; 4], LessonError> {
  let total: u64 = weights.iter().map(|w| u64::from(*w)).sum();
  if total == 0 {
    return Err(LessonError::normalization("time allocation weights sum to zero"));
  }

  let mut shares = [0u32; 4];
  let mut remainders = [(0u64, 0usize); 4];
  for (index, weight) in weights.iter().enumerate() {
    let scaled = u64::from(*weight) * 100;
    shares[index] = (scaled / total) as u32;
    remainders[index] = (scaled % total, index);
  }

  let assigned: u32 = shares.iter().sum();
  let missing = 100u32.saturating_sub(assigned) as usize;

  // Largest remainder first; earlier category wins ties
  remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
  for (_, index) in remainders.iter().take(missing) {
    shares[*index] += 1;
  }

  Ok(shares)
}

// Helpers
// =======

fn count(len: usize) -> u32 {
  u32::try_from(len).unwrap_or(u32::MAX)
}

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

/// JSON truthiness: empty containers, empty strings, zero, false and null
/// count as nothing
pub(crate) fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    Value::String(s) => !s.is_empty(),
    Value::Array(items) => !items.is_empty(),
    Value::Object(map) => !map.is_empty(),
  }
}
