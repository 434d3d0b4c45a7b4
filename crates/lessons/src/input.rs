//! Request boundary: wire types, validation and preprocessing
//!
//! The frontend sends loosely shaped JSON. [`LessonEnvelope::canonicalize`]
//! checks it, reporting the first problem found, and produces the canonical
//! [`LearnerProfile`] / [`LessonRequest`] pair. The envelope itself is left
//! untouched.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::model::{
  CefrLevel, ContextualUse, LearnerProfile, LearningPhase, LearningStyle, LessonRequest,
  DEFAULT_TOPIC,
};
use crate::priorities::RawPriorities;

/// Malformed or missing profile/request fields
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct InputError {
  pub message: String,
}

impl InputError {
  pub fn new(message: impl Into<String>) -> Self {
    Self { message: message.into() }
  }
}

// Wire Types
// ==========

/// `{ userProfile, lessonRequest }` as posted by the frontend
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonEnvelope {
  #[serde(default)]
  pub user_profile: Option<ProfileInput>,
  #[serde(default)]
  pub lesson_request: Option<LessonRequestInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
  #[serde(default)]
  pub nationality: Option<String>,
  #[serde(default)]
  pub native_languages: Option<NativeLanguages>,
  #[serde(default)]
  pub additional_languages: Option<Vec<String>>,
  #[serde(default)]
  pub learning_style: Option<String>,
  #[serde(default)]
  pub placement_test: Option<PlacementTest>,
}

/// Older clients send a single string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum NativeLanguages {
  One(String),
  Many(Vec<String>),
}

impl NativeLanguages {
  fn into_list(self) -> Vec<String> {
    match self {
      NativeLanguages::One(language) => vec![language],
      NativeLanguages::Many(languages) => languages,
    }
  }

  fn is_empty(&self) -> bool {
    match self {
      NativeLanguages::One(language) => language.is_empty(),
      NativeLanguages::Many(languages) => languages.is_empty(),
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlacementTest {
  #[serde(default)]
  pub cefr_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonRequestInput {
  #[serde(default)]
  pub target_language: Option<TargetLanguage>,
  #[serde(default)]
  pub contextual_use: Option<ContextualUse>,
  #[serde(default)]
  pub topic: Option<String>,
  #[serde(default)]
  pub proficiency_level: Option<String>,
  #[serde(default, alias = "currentPhase")]
  pub learning_phase: Option<String>,
  /// Kept loose so a malformed value degrades to defaults instead of
  /// rejecting the envelope
  #[serde(default)]
  pub phase_priorities: Option<Value>,
  #[serde(default)]
  pub user_priorities: Option<Value>,
}

/// Target language as a bare name or as the language selector's object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TargetLanguage {
  Name(String),
  Detailed(TargetLanguageDetail),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetLanguageDetail {
  #[serde(default)]
  pub language: Option<String>,
  /// Why the learner picked the language; becomes the contextual inspiration
  #[serde(default)]
  pub reason: Option<String>,
  #[serde(default)]
  pub is_spanish_specialty: Option<bool>,
}

// Validation and Preprocessing
// ============================

impl LessonEnvelope {
  /// Validate the envelope and build the canonical profile and request
  pub fn canonicalize(&self) -> Result<(LearnerProfile, LessonRequest), InputError> {
    let profile_input = self.user_profile.as_ref().ok_or_else(|| InputError::new("Missing user profile"))?;
    let mut profile = canonical_profile(profile_input)?;

    let request_input =
      self.lesson_request.as_ref().ok_or_else(|| InputError::new("Missing lesson request"))?;
    let (target_language, contextual_use) = flatten_target_language(request_input)?;
    let explicit_level = requested_proficiency(request_input)?;
    profile.placement_level = placement_level(profile_input)?;
    let current_phase = learning_phase(request_input)?;

    let request = LessonRequest {
      target_language,
      contextual_use: contextual_use.unwrap_or_else(ContextualUse::personal),
      topic: request_input.topic.clone().unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
      proficiency_level: Some(
        explicit_level.or(profile.placement_level).unwrap_or(CefrLevel::LOWEST),
      ),
      current_phase,
      phase_priorities: priorities_object("phasePriorities", request_input.phase_priorities.as_ref()),
      user_priorities: priorities_object("userPriorities", request_input.user_priorities.as_ref()),
      complexity: None,
    };

    Ok((profile, request))
  }
}

/// Required profile fields; the placement level is checked later
fn canonical_profile(input: &ProfileInput) -> Result<LearnerProfile, InputError> {
  let nationality = input
    .nationality
    .as_deref()
    .filter(|n| !n.is_empty())
    .ok_or_else(|| InputError::new("Missing required user profile field: nationality"))?;

  let native_languages = input
    .native_languages
    .clone()
    .filter(|langs| !langs.is_empty())
    .ok_or_else(|| InputError::new("Missing required user profile field: nativeLanguages"))?
    .into_list();

  let style = input
    .learning_style
    .as_deref()
    .filter(|s| !s.is_empty())
    .ok_or_else(|| InputError::new("Missing required user profile field: learningStyle"))?;
  let learning_style = LearningStyle::parse(style)
    .ok_or_else(|| InputError::new(format!("Invalid learning style: {style}")))?;

  Ok(LearnerProfile {
    nationality: nationality.to_string(),
    native_languages,
    additional_languages: input.additional_languages.clone().unwrap_or_default(),
    learning_style,
    placement_level: None,
  })
}

/// Resolve the target language, folding selector extras into contextual use
fn flatten_target_language(
  input: &LessonRequestInput,
) -> Result<(String, Option<ContextualUse>), InputError> {
  let target = input
    .target_language
    .as_ref()
    .filter(|t| !matches!(t, TargetLanguage::Name(name) if name.is_empty()))
    .ok_or_else(|| InputError::new("Missing required lesson request field: targetLanguage"))?;

  let mut contextual_use = input.contextual_use.clone();
  let target_language = match target {
    TargetLanguage::Name(name) => non_blank(name)?.to_string(),
    TargetLanguage::Detailed(detail) => {
      let language = detail
        .language
        .as_deref()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| InputError::new("Target language object missing 'language' field"))?;
      let language = non_blank(language)?.to_string();

      if let Some(reason) = &detail.reason {
        contextual_use.get_or_insert_with(ContextualUse::default).inspiration = Some(reason.clone());
      }
      if let Some(specialty) = detail.is_spanish_specialty {
        contextual_use.get_or_insert_with(ContextualUse::default).is_spanish_specialty =
          Some(specialty);
      }
      language
    }
  };

  Ok((target_language, contextual_use))
}

fn requested_proficiency(input: &LessonRequestInput) -> Result<Option<CefrLevel>, InputError> {
  match input.proficiency_level.as_deref() {
    Some(level) if !level.is_empty() => CefrLevel::parse(level).map(Some).ok_or_else(|| {
      InputError::new(format!(
        "Invalid proficiency level: {level}. Must be one of {}",
        list(CefrLevel::ALL.iter().map(CefrLevel::as_str))
      ))
    }),
    _ => Ok(None),
  }
}

fn placement_level(input: &ProfileInput) -> Result<Option<CefrLevel>, InputError> {
  match input.placement_test.as_ref().and_then(|p| p.cefr_level.as_deref()) {
    Some(level) if !level.is_empty() => CefrLevel::parse(level)
      .map(Some)
      .ok_or_else(|| InputError::new(format!("Invalid CEFR level in placement test: {level}"))),
    _ => Ok(None),
  }
}

fn learning_phase(input: &LessonRequestInput) -> Result<LearningPhase, InputError> {
  match input.learning_phase.as_deref() {
    Some(phase) if !phase.is_empty() => LearningPhase::parse(phase).ok_or_else(|| {
      InputError::new(format!(
        "Invalid learning phase: {phase}. Must be one of {}",
        list(LearningPhase::ALL.iter().map(LearningPhase::as_str))
      ))
    }),
    _ => Ok(LearningPhase::default()),
  }
}

/// Only JSON objects are read as MoSCoW categories; anything else is ignored
fn priorities_object(field: &str, value: Option<&Value>) -> Option<RawPriorities> {
  let value = value?;
  if !value.is_object() {
    if !value.is_null() {
      warn!(field, "ignoring priorities that are not an object");
    }
    return None;
  }
  serde_json::from_value(value.clone())
    .map_err(|e| warn!(field, error = %e, "ignoring unreadable priorities"))
    .ok()
}

fn non_blank(value: &str) -> Result<&str, InputError> {
  if value.trim().is_empty() {
    return Err(InputError::new("Target language must be a non-empty string"));
  }
  Ok(value)
}

/// Rendered the way the frontend has always shown the allowed values
fn list<'a>(items: impl Iterator<Item = &'a str>) -> String {
  format!("[{}]", items.map(|item| format!("'{item}'")).collect::<Vec<_>>().join(", "))
}
