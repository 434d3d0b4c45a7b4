//! Lesson prompt construction

use std::fmt::Write;

use crate::model::{LearnerProfile, LessonRequest, UseType};
use crate::priorities::{PriorityProfile, TimeAllocation};

const FOCUS_ITEMS: usize = 3;
const PRIMARY_ITEMS: usize = 4;
const EXCLUDED_ITEMS: usize = 2;

/// One-line summary of what the lesson should concentrate on
pub fn priority_focus(priorities: &PriorityProfile) -> String {
  let mut parts = Vec::new();
  if !priorities.must_have.is_empty() {
    parts.push(format!("CRITICAL FOCUS: {}", head(&priorities.must_have, FOCUS_ITEMS)));
  }
  if !priorities.should_have.is_empty() {
    parts.push(format!("Secondary focus: {}", head(&priorities.should_have, FOCUS_ITEMS)));
  }

  if parts.is_empty() {
    return "balanced approach to all language learning aspects".to_string();
  }
  parts.join(" | ")
}

/// Thematic wrapper derived from the contextual-use descriptor
pub fn thematic_context(request: &LessonRequest) -> (String, &'static str) {
  let contextual = &request.contextual_use;
  let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

  match (&contextual.use_type, non_empty(&contextual.specific_situation)) {
    (Some(UseType::Professional), Some(situation)) => (
      format!("Professional context: {situation}"),
      "business scenarios, workplace vocabulary, formal communication",
    ),
    _ => {
      // A missing type reads as personal
      let personal = matches!(contextual.use_type, None | Some(UseType::Personal));
      let inspiration =
        non_empty(&contextual.inspiration).or_else(|| non_empty(&contextual.personal_interest));
      match inspiration {
        Some(theme) if personal => (
          format!("Personal interest context: {theme}"),
          "themed examples using personal inspiration as narrative framework",
        ),
        _ => (
          "General practical communication".to_string(),
          "everyday situations, practical vocabulary",
        ),
      }
    }
  }
}

pub fn build_lesson_prompt(
  profile: &LearnerProfile,
  request: &LessonRequest,
  priorities: &PriorityProfile,
  allocation: &TimeAllocation,
) -> String {
  let language = &request.target_language;
  let native = profile.primary_language();
  let level = request.proficiency_or_lowest();
  let (theme, approach) = thematic_context(request);

  let additional = if profile.additional_languages.is_empty() {
    "None".to_string()
  } else {
    profile.additional_languages.join(", ")
  };

  let mut prompt = String::new();
  // Writing to a String cannot fail
  let _ = write!(
    prompt,
    "You are PACIFIC AI, a tutor that teaches {language} through thematic contextualization.

TASK: Produce one structured {language} lesson. The learner's context is a narrative wrapper
around standard curriculum; the lesson teaches {language}, it is not about the theme.

LEARNER
- Native languages: {natives}
- Nationality: {nationality}
- Additional languages: {additional}
- Learning style: {style}
- Current {language} level: {level}

LESSON
- Topic: {topic}
- Thematic context: {theme}
- Approach: {approach}
- Learning phase: {phase}
",
    natives = profile.native_languages.join(", "),
    nationality = profile.nationality,
    style = profile.learning_style,
    topic = request.topic,
    phase = request.current_phase,
  );

  let _ = write!(
    prompt,
    "
PRIORITIES (MoSCoW)
- Focus: {focus}
- Time split: {must}% critical, {should}% secondary, {could}% optional, {buffer}% review
- Primary content: {primary}
- Secondary content: {secondary}
- Leave out: {excluded}
",
    focus = priority_focus(priorities),
    must = allocation.must_have,
    should = allocation.should_have,
    could = allocation.could_have,
    buffer = allocation.buffer,
    primary = or_default(&priorities.must_have, PRIMARY_ITEMS, "core curriculum"),
    secondary = or_default(&priorities.should_have, FOCUS_ITEMS, "balanced learning"),
    excluded = or_default(&priorities.wont_have, EXCLUDED_ITEMS, "none specified"),
  );

  if request.complexity.as_deref() == Some("basic") {
    prompt.push_str("\nKeep the lesson short and simple: few vocabulary items, one grammar point.\n");
  }

  let _ = write!(
    prompt,
    r#"
Relate explanations to {native} where it helps: cognates, shared structures, cultural parallels.

Reply with JSON only, in this shape:
{{
  "lesson": {{
    "title": "...",
    "objective": "...",
    "themeContext": "...",
    "coreContent": {{
      "vocabulary": [{{"word": "...", "translation": "... ({native})", "context": "...", "pronunciation": "..."}}],
      "grammar": {{"rule": "...", "explanation": "...", "examples": ["..."], "practice": ["..."]}},
      "dialogues": [{{"speaker": "...", "text": "..."}}],
      "practiceExercises": [{{"type": "multiple_choice", "question": "...", "options": ["..."], "correct": 0}}]
    }},
    "culturalNotes": "...",
    "pronunciation": {{"focus": "...", "drills": ["..."]}},
    "nextSteps": "..."
  }},
  "metadata": {{
    "difficultyLevel": "{level}",
    "estimatedTime": "...",
    "skillsFocused": ["..."],
    "thematicElements": ["..."]
  }}
}}
"#
  );

  prompt
}

fn head(items: &[String], n: usize) -> String {
  items.iter().take(n).cloned().collect::<Vec<_>>().join(", ")
}

fn or_default(items: &[String], n: usize, default: &str) -> String {
  if items.is_empty() {
    default.to_string()
  } else {
    head(items, n)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{ContextualUse, LearningStyle};

  fn profile() -> LearnerProfile {
    LearnerProfile {
      nationality: "JP".to_string(),
      native_languages: vec!["Japanese".to_string(), "English".to_string()],
      additional_languages: vec![],
      learning_style: LearningStyle::Reading,
      placement_level: None,
    }
  }

  #[test]
  fn test_focus_uses_first_three() {
    let priorities = PriorityProfile {
      must_have: vec!["a", "b", "c", "d"].into_iter().map(String::from).collect(),
      should_have: vec!["x".to_string()],
      ..PriorityProfile::default()
    };
    assert_eq!(priority_focus(&priorities), "CRITICAL FOCUS: a, b, c | Secondary focus: x");
    assert_eq!(
      priority_focus(&PriorityProfile::default()),
      "balanced approach to all language learning aspects"
    );
  }

  #[test]
  fn test_thematic_context_variants() {
    let mut request = LessonRequest::new("French", "Work");
    request.contextual_use = ContextualUse {
      use_type: Some(UseType::Professional),
      specific_situation: Some("Hotel front desk".to_string()),
      ..ContextualUse::default()
    };
    assert_eq!(thematic_context(&request).0, "Professional context: Hotel front desk");

    request.contextual_use =
      ContextualUse { inspiration: Some("Amélie".to_string()), ..ContextualUse::default() };
    assert_eq!(thematic_context(&request).0, "Personal interest context: Amélie");

    request.contextual_use = ContextualUse {
      use_type: Some(UseType::Personal),
      personal_interest: Some("cycling".to_string()),
      ..ContextualUse::default()
    };
    assert_eq!(thematic_context(&request).0, "Personal interest context: cycling");

    request.contextual_use = ContextualUse::personal();
    assert_eq!(thematic_context(&request).0, "General practical communication");
  }

  #[test]
  fn test_prompt_mentions_inputs() {
    let mut request = LessonRequest::new("French", "Bakery");
    request.complexity = Some("basic".to_string());
    let priorities = PriorityProfile {
      wont_have: vec!["Slang".to_string(), "Idioms".to_string(), "Poetry".to_string()],
      ..PriorityProfile::balanced_default()
    };

    let prompt =
      build_lesson_prompt(&profile(), &request, &priorities, &TimeAllocation::FALLBACK);
    assert!(prompt.contains("Topic: Bakery"));
    assert!(prompt.contains("Native languages: Japanese, English"));
    assert!(prompt.contains("70% critical"));
    assert!(prompt.contains("Leave out: Slang, Idioms\n"));
    assert!(prompt.contains("short and simple"));
    assert!(prompt.contains("(Japanese)"));
    assert!(prompt.contains("\"difficultyLevel\": \"A1\""));
  }
}
