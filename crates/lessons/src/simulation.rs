//! Conversation simulation content
//!
//! Scenarios and dialogue turns for the simulation phase. These are canned,
//! chosen by contextual-use type and target language; no model is called.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{LessonRequest, UseType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Character {
  pub name: String,
  pub role: String,
  pub formality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
  pub title: String,
  pub location: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub situation: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub characters: Vec<Character>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cultural_context: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub objectives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DialogueTurn {
  pub speaker: String,
  pub text: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub translation: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pronunciation: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cultural_note: Option<String>,
}

impl DialogueTurn {
  fn plain(speaker: &str, text: impl Into<String>) -> Self {
    Self {
      speaker: speaker.to_string(),
      text: text.into(),
      translation: None,
      pronunciation: None,
      cultural_note: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioResponse {
  pub scenario: Scenario,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DialogueResponse {
  pub dialogue: Vec<DialogueTurn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationResponse {
  pub next_turn: DialogueTurn,
}

fn targets(request: &LessonRequest, language: &str) -> bool {
  request.target_language.to_lowercase().contains(language)
}

pub fn generate_scenario(request: &LessonRequest) -> ScenarioResponse {
  let contextual = &request.contextual_use;

  let scenario = match contextual.use_type {
    Some(UseType::Professional) if targets(request, "spanish") => Scenario {
      title: "Business Meeting in Asunción".to_string(),
      location: "Paraguay Trade Office, Asunción".to_string(),
      situation: Some("Negotiating agricultural export agreement".to_string()),
      characters: vec![Character {
        name: "Carlos Mendoza".to_string(),
        role: "Export Director".to_string(),
        formality: "formal".to_string(),
      }],
      cultural_context: Some("Paraguayan business culture values relationship-building".to_string()),
      objectives: vec!["Establish trade partnership".to_string(), "Negotiate pricing".to_string()],
    },
    Some(UseType::Personal) if targets(request, "italian") => Scenario {
      title: "Exploring Italian Heritage".to_string(),
      location: match contextual.inspiration.as_deref().filter(|i| !i.is_empty()) {
        Some(inspiration) => format!("Venice, inspired by {inspiration}"),
        None => "Venice".to_string(),
      },
      situation: Some("Cultural immersion through character inspiration".to_string()),
      characters: vec![Character {
        name: "Marco Benetti".to_string(),
        role: "Local historian".to_string(),
        formality: "friendly".to_string(),
      }],
      cultural_context: Some("Italian appreciation for art and culture".to_string()),
      objectives: vec!["Learn about Italian culture".to_string(), "Practice conversation".to_string()],
    },
    _ => Scenario {
      title: format!("{} Practice", request.target_language),
      location: "General setting".to_string(),
      situation: None,
      characters: Vec::new(),
      cultural_context: None,
      objectives: Vec::new(),
    },
  };

  ScenarioResponse { scenario }
}

pub fn generate_dialogue(request: &LessonRequest) -> DialogueResponse {
  let opening = if targets(request, "spanish") {
    DialogueTurn {
      speaker: "Carlos Mendoza".to_string(),
      text: "Buenos días. Es un placer conocerle.".to_string(),
      translation: Some("Good morning. It's a pleasure to meet you.".to_string()),
      pronunciation: Some("BWE-nos DEE-as. Es un pla-SER ko-no-SER-le.".to_string()),
      cultural_note: Some("Formal greetings are very important in business.".to_string()),
    }
  } else if targets(request, "italian") {
    DialogueTurn {
      speaker: "Marco Benetti".to_string(),
      text: "Ciao! Benvenuto a Venezia!".to_string(),
      translation: Some("Hi! Welcome to Venice!".to_string()),
      pronunciation: Some("CHAH-o! Ben-ve-NU-to a Ve-NE-tsee-a!".to_string()),
      cultural_note: Some("Venetians are warm and welcoming.".to_string()),
    }
  } else {
    DialogueTurn::plain("Partner", format!("Hello! Let's practice {}.", request.target_language))
  };

  DialogueResponse { dialogue: vec![opening] }
}

pub fn continue_dialogue(_request: &LessonRequest) -> ContinuationResponse {
  ContinuationResponse {
    next_turn: DialogueTurn {
      translation: Some("Continue the conversation!".to_string()),
      cultural_note: Some("Keep practicing!".to_string()),
      ..DialogueTurn::plain("Conversation Partner", "That's interesting! Tell me more.")
    },
  }
}
