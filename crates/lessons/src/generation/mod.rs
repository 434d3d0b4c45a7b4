//! Lesson generation service abstraction
//!
//! The pipeline talks to the model through [`GenerationService`]. The shipped
//! implementation is [`ConverseClient`]; tests substitute mocks.

mod converse;

pub use converse::{ConverseClient, ConverseConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Sampling parameters for one generation call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
  pub max_tokens: u32,
  pub temperature: f32,
  pub top_p: f32,
}

impl GenerationParams {
  /// Full lessons on the primary model
  pub const PRIMARY: GenerationParams =
    GenerationParams { max_tokens: 4000, temperature: 0.7, top_p: 0.9 };

  /// Simplified retries on the lightweight model
  pub const LIGHTWEIGHT: GenerationParams =
    GenerationParams { max_tokens: 2000, temperature: 0.5, top_p: 0.8 };
}

impl Default for GenerationParams {
  fn default() -> Self {
    Self::PRIMARY
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutput {
  /// Model replied with a JSON document
  Structured(Value),
  /// Model replied with something that did not parse as JSON
  RawText(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
  #[error("API rate limit exceeded. Please try again in a moment.")]
  RateLimited { message: String },

  #[error("Invalid request parameters sent to AI model: {message}")]
  InvalidRequest { message: String },

  #[error("AI model error: {message}")]
  Failed { message: String },

  #[error("Lesson generation timed out after {seconds}s")]
  Timeout { seconds: u64 },
}

impl GenerationError {
  pub fn rate_limited(message: impl Into<String>) -> Self {
    Self::RateLimited { message: message.into() }
  }

  pub fn invalid_request(message: impl Into<String>) -> Self {
    Self::InvalidRequest { message: message.into() }
  }

  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed { message: message.into() }
  }
}

#[async_trait]
pub trait GenerationService: Send + Sync {
  /// Identifier of the model this service calls, recorded in lesson metadata
  fn model_id(&self) -> String;

  async fn generate(
    &self,
    prompt: &str,
    params: &GenerationParams,
  ) -> Result<GenerationOutput, GenerationError>;
}
