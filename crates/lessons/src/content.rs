//! Generated lesson payloads and their structural checks

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{LearningPhase, LessonRequest};
use crate::priorities::TimeAllocation;

/// Fewest practice exercises a well-formed lesson carries
pub const MIN_PRACTICE_EXERCISES: usize = 2;

const REQUIRED_LESSON_FIELDS: [&str; 4] = ["title", "objective", "themeContext", "coreContent"];
const REQUIRED_VOCABULARY_FIELDS: [&str; 3] = ["word", "translation", "context"];
const REQUIRED_GRAMMAR_FIELDS: [&str; 3] = ["rule", "explanation", "examples"];

/// How the lesson content was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LessonFormat {
  Structured,
  TextFallback,
  Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonMetadata {
  pub timestamp: DateTime<Utc>,
  pub model_used: String,
  /// mustHave labels the lesson was focused on
  pub priority_focus: Vec<String>,
  pub phase_optimized: LearningPhase,
  pub time_allocation: TimeAllocation,
  pub format: LessonFormat,
}

/// A lesson as produced by generation and stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedLesson {
  pub lesson_content: Value,
  pub metadata: LessonMetadata,
}

impl GeneratedLesson {
  pub fn is_fallback(&self) -> bool {
    self.metadata.format == LessonFormat::Fallback
  }
}

// Validation
// ==========

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentIssue {
  #[error("Generated lesson missing required field: {0}")]
  MissingField(&'static str),

  #[error("Generated lesson lacks substantial vocabulary or grammar content")]
  NoCoreMaterial,

  #[error("Missing thematic contextualization")]
  MissingTheme,

  #[error("Insufficient practice exercises ({found}, minimum {MIN_PRACTICE_EXERCISES} required)")]
  TooFewExercises { found: usize },

  #[error("Vocabulary item {index} missing required fields")]
  IncompleteVocabulary { index: usize },

  #[error("Grammar section missing required fields")]
  IncompleteGrammar,
}

/// First structural problem in a lesson document, if any
pub fn inspect_lesson_content(content: &Value) -> Result<(), ContentIssue> {
  let empty = json!({});
  let lesson = content.get("lesson").unwrap_or(&empty);

  for field in REQUIRED_LESSON_FIELDS {
    if lesson.get(field).is_none() {
      return Err(ContentIssue::MissingField(field));
    }
  }

  let core = &lesson["coreContent"];
  let vocabulary = core.get("vocabulary").filter(|v| is_present(v));
  let grammar = core.get("grammar").filter(|g| is_present(g));
  if vocabulary.is_none() && grammar.is_none() {
    return Err(ContentIssue::NoCoreMaterial);
  }

  if !is_present(&lesson["themeContext"]) {
    return Err(ContentIssue::MissingTheme);
  }

  let exercises = core.get("practiceExercises").and_then(Value::as_array).map_or(0, Vec::len);
  if exercises < MIN_PRACTICE_EXERCISES {
    return Err(ContentIssue::TooFewExercises { found: exercises });
  }

  if let Some(items) = vocabulary.and_then(Value::as_array) {
    for (index, item) in items.iter().enumerate() {
      if !REQUIRED_VOCABULARY_FIELDS.iter().all(|key| item.get(key).is_some()) {
        return Err(ContentIssue::IncompleteVocabulary { index });
      }
    }
  }

  if let Some(grammar) = grammar {
    if !REQUIRED_GRAMMAR_FIELDS.iter().all(|key| grammar.get(key).is_some()) {
      return Err(ContentIssue::IncompleteGrammar);
    }
  }

  Ok(())
}

/// Advisory check: logs the problem and reports whether the lesson passed
pub fn validate_lesson_content(content: &Value) -> bool {
  match inspect_lesson_content(content) {
    Ok(()) => {
      debug!("lesson content validation passed");
      true
    }
    Err(issue) => {
      warn!(%issue, "generated lesson failed validation");
      false
    }
  }
}

fn is_present(value: &Value) -> bool {
  crate::priorities::is_truthy(value)
}

// Substitutes
// ===========

/// Wraps unparseable model output so callers still get a lesson document
pub fn text_fallback_content(text: &str) -> Value {
  json!({
    "lesson": {
      "title": "Generated Language Lesson",
      "content": text,
      "format": "text_fallback",
    }
  })
}

/// Hand-built lesson served when generation is unavailable
pub fn fallback_lesson_content(request: &LessonRequest) -> Value {
  let language = &request.target_language;
  let topic = &request.topic;

  json!({
    "lesson": {
      "title": format!("Basic {language} Lesson: {topic}"),
      "objective": format!("Learn fundamental {language} concepts related to {topic}"),
      "themeContext": "Basic structured learning approach",
      "coreContent": {
        "vocabulary": [
          {"word": "hello", "translation": "greeting", "context": "Basic greeting phrase"}
        ],
        "grammar": {
          "rule": "Basic sentence structure",
          "explanation": "Simple subject-verb-object pattern",
          "examples": ["Hello, how are you?"]
        },
        "practiceExercises": [
          {
            "type": "basic",
            "question": format!("Practice basic {language} greetings"),
            "answer": "User practice required"
          }
        ]
      },
      "culturalNotes": format!("Basic cultural context for {language}"),
      "nextSteps": "Continue with vocabulary building",
      "fallback": true
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn well_formed() -> Value {
    json!({
      "lesson": {
        "title": "Ordering coffee",
        "objective": "Use 'quisiera' politely",
        "themeContext": "A morning in Madrid",
        "coreContent": {
          "vocabulary": [
            {"word": "café", "translation": "coffee", "context": "Un café, por favor."}
          ],
          "grammar": {
            "rule": "Conditional of querer",
            "explanation": "Softens requests",
            "examples": ["Quisiera un té."]
          },
          "practiceExercises": [
            {"type": "translation", "source": "I would like water", "target": "Quisiera agua"},
            {"type": "fill_blank", "sentence": "____ un café", "answer": "Quisiera"}
          ]
        }
      }
    })
  }

  #[test]
  fn test_well_formed_lesson_passes() {
    assert_eq!(inspect_lesson_content(&well_formed()), Ok(()));
    assert!(validate_lesson_content(&well_formed()));
  }

  #[test]
  fn test_missing_required_field() {
    let mut lesson = well_formed();
    lesson["lesson"].as_object_mut().unwrap().remove("objective");
    assert_eq!(inspect_lesson_content(&lesson), Err(ContentIssue::MissingField("objective")));

    assert_eq!(inspect_lesson_content(&json!({})), Err(ContentIssue::MissingField("title")));
  }

  #[test]
  fn test_requires_vocabulary_or_grammar() {
    let mut lesson = well_formed();
    lesson["lesson"]["coreContent"]["vocabulary"] = json!([]);
    lesson["lesson"]["coreContent"]["grammar"] = json!({});
    assert_eq!(inspect_lesson_content(&lesson), Err(ContentIssue::NoCoreMaterial));

    let mut grammar_only = well_formed();
    grammar_only["lesson"]["coreContent"]["vocabulary"] = json!([]);
    assert_eq!(inspect_lesson_content(&grammar_only), Ok(()));
  }

  #[test]
  fn test_empty_theme_is_rejected() {
    let mut lesson = well_formed();
    lesson["lesson"]["themeContext"] = json!("");
    assert_eq!(inspect_lesson_content(&lesson), Err(ContentIssue::MissingTheme));
  }

  #[test]
  fn test_needs_two_exercises() {
    let mut lesson = well_formed();
    lesson["lesson"]["coreContent"]["practiceExercises"] = json!([{"type": "basic"}]);
    assert_eq!(inspect_lesson_content(&lesson), Err(ContentIssue::TooFewExercises { found: 1 }));
  }

  #[test]
  fn test_incomplete_vocabulary_and_grammar() {
    let mut lesson = well_formed();
    lesson["lesson"]["coreContent"]["vocabulary"]
      .as_array_mut()
      .unwrap()
      .push(json!({"word": "leche"}));
    assert_eq!(inspect_lesson_content(&lesson), Err(ContentIssue::IncompleteVocabulary { index: 1 }));

    let mut lesson = well_formed();
    lesson["lesson"]["coreContent"]["grammar"] = json!({"rule": "Ser vs estar"});
    assert_eq!(inspect_lesson_content(&lesson), Err(ContentIssue::IncompleteGrammar));
  }

  #[test]
  fn test_fallback_lesson_names_language_and_topic() {
    let content = fallback_lesson_content(&LessonRequest::new("Portuguese", "Market"));
    assert_eq!(content["lesson"]["title"], "Basic Portuguese Lesson: Market");
    assert_eq!(content["lesson"]["fallback"], true);
    assert_eq!(content["lesson"]["coreContent"]["vocabulary"].as_array().unwrap().len(), 1);
    assert_eq!(content["lesson"]["coreContent"]["practiceExercises"].as_array().unwrap().len(), 1);
  }

  #[test]
  fn test_text_fallback_wraps_raw_output() {
    let content = text_fallback_content("Lesson one: greetings");
    assert_eq!(content["lesson"]["content"], "Lesson one: greetings");
    assert_eq!(content["lesson"]["format"], "text_fallback");
  }
}
