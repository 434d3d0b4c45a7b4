//! Canonical learner and lesson types
//!
//! These are the shapes the pipeline works with after boundary validation.
//! Wire-level variants (bare vs. structured target language, string vs. list
//! native languages) are resolved in [`crate::input`] before anything here is
//! constructed.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::priorities::RawPriorities;

/// Topic used when the request names none
pub const DEFAULT_TOPIC: &str = "Basic Communication";

// Enumerations
// ============

/// Learning styles recognized by the lesson generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LearningStyle {
  Visual,
  Auditory,
  Reading,
  Kinesthetic,
  Balanced,
  VisualAuditory,
  VisualKinesthetic,
  AuditoryKinesthetic,
}

impl LearningStyle {
  pub const ALL: [LearningStyle; 8] = [
    LearningStyle::Visual,
    LearningStyle::Auditory,
    LearningStyle::Reading,
    LearningStyle::Kinesthetic,
    LearningStyle::Balanced,
    LearningStyle::VisualAuditory,
    LearningStyle::VisualKinesthetic,
    LearningStyle::AuditoryKinesthetic,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      LearningStyle::Visual => "visual",
      LearningStyle::Auditory => "auditory",
      LearningStyle::Reading => "reading",
      LearningStyle::Kinesthetic => "kinesthetic",
      LearningStyle::Balanced => "balanced",
      LearningStyle::VisualAuditory => "visual-auditory",
      LearningStyle::VisualKinesthetic => "visual-kinesthetic",
      LearningStyle::AuditoryKinesthetic => "auditory-kinesthetic",
    }
  }

  pub fn parse(value: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|style| style.as_str() == value)
  }
}

impl fmt::Display for LearningStyle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Common European Framework of Reference proficiency levels
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum CefrLevel {
  A1,
  A2,
  B1,
  B2,
  C1,
  C2,
}

impl CefrLevel {
  pub const ALL: [CefrLevel; 6] =
    [CefrLevel::A1, CefrLevel::A2, CefrLevel::B1, CefrLevel::B2, CefrLevel::C1, CefrLevel::C2];

  /// The level assumed for learners without any placement information
  pub const LOWEST: CefrLevel = CefrLevel::A1;

  pub fn as_str(&self) -> &'static str {
    match self {
      CefrLevel::A1 => "A1",
      CefrLevel::A2 => "A2",
      CefrLevel::B1 => "B1",
      CefrLevel::B2 => "B2",
      CefrLevel::C1 => "C1",
      CefrLevel::C2 => "C2",
    }
  }

  pub fn parse(value: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|level| level.as_str() == value)
  }
}

impl fmt::Display for CefrLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Phase of the learning cycle a lesson is generated for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LearningPhase {
  #[default]
  NewKnowledge,
  Consolidate,
  Simulation,
}

impl LearningPhase {
  pub const ALL: [LearningPhase; 3] =
    [LearningPhase::NewKnowledge, LearningPhase::Consolidate, LearningPhase::Simulation];

  pub fn as_str(&self) -> &'static str {
    match self {
      LearningPhase::NewKnowledge => "new_knowledge",
      LearningPhase::Consolidate => "consolidate",
      LearningPhase::Simulation => "simulation",
    }
  }

  pub fn parse(value: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|phase| phase.as_str() == value)
  }
}

impl fmt::Display for LearningPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Why the learner wants the language.
///
/// Unrecognized values are kept verbatim so they still distinguish cache
/// fingerprints; they fall through to the balanced priority heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UseType {
  Professional,
  Personal,
  Other(String),
}

impl UseType {
  pub fn as_str(&self) -> &str {
    match self {
      UseType::Professional => "professional",
      UseType::Personal => "personal",
      UseType::Other(value) => value,
    }
  }
}

impl From<String> for UseType {
  fn from(value: String) -> Self {
    match value.to_lowercase().as_str() {
      "professional" => UseType::Professional,
      "personal" => UseType::Personal,
      _ => UseType::Other(value),
    }
  }
}

impl Serialize for UseType {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for UseType {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    String::deserialize(deserializer).map(UseType::from)
  }
}

// Profile and Request
// ===================

/// Contextual-use descriptor: what the learner needs the language for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContextualUse {
  /// professional | personal (other values are tolerated)
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  #[schemars(with = "Option<String>")]
  pub use_type: Option<UseType>,

  /// Person, work or story the learner draws motivation from
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub inspiration: Option<String>,

  /// Concrete professional situation
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub specific_situation: Option<String>,

  /// Personal interest used as a thematic wrapper
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub personal_interest: Option<String>,

  /// Presence enables the contextual priority heuristic
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub priority_scale: Option<serde_json::Value>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_spanish_specialty: Option<bool>,
}

impl ContextualUse {
  /// Descriptor used when a request carries no contextual information at all
  pub fn personal() -> Self {
    Self { use_type: Some(UseType::Personal), ..Self::default() }
  }
}

/// Learner profile after boundary validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
  pub nationality: String,

  /// Ordered, never empty
  pub native_languages: Vec<String>,

  #[serde(default)]
  pub additional_languages: Vec<String>,

  pub learning_style: LearningStyle,

  /// CEFR level from the placement test, if one was taken
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub placement_level: Option<CefrLevel>,
}

impl LearnerProfile {
  /// First native language, used as the translation language in prompts
  pub fn primary_language(&self) -> &str {
    self.native_languages.first().map(String::as_str).unwrap_or("English")
  }
}

/// Lesson request in canonical, flattened form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonRequest {
  pub target_language: String,

  pub contextual_use: ContextualUse,

  pub topic: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub proficiency_level: Option<CefrLevel>,

  #[serde(default)]
  pub current_phase: LearningPhase,

  /// Priorities scoped to the current phase
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phase_priorities: Option<RawPriorities>,

  /// Priorities the learner set for themselves
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_priorities: Option<RawPriorities>,

  /// Set to "basic" by the fallback layer's simplified retry
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub complexity: Option<String>,
}

impl LessonRequest {
  /// Minimal request for a language and topic; everything else defaulted
  pub fn new(target_language: impl Into<String>, topic: impl Into<String>) -> Self {
    Self {
      target_language: target_language.into(),
      contextual_use: ContextualUse::personal(),
      topic: topic.into(),
      proficiency_level: Some(CefrLevel::LOWEST),
      current_phase: LearningPhase::default(),
      phase_priorities: None,
      user_priorities: None,
      complexity: None,
    }
  }

  pub fn proficiency_or_lowest(&self) -> CefrLevel {
    self.proficiency_level.unwrap_or(CefrLevel::LOWEST)
  }
}
