//! HTTP client for a hosted model exposing a Converse-style API

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{GenerationError, GenerationOutput, GenerationParams, GenerationService};

const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";
const THROTTLING: &str = "ThrottlingException";
const VALIDATION: &str = "ValidationException";

#[derive(Debug, Clone)]
pub struct ConverseConfig {
  /// Base URL, e.g. "https://bedrock-runtime.us-east-1.amazonaws.com"
  pub endpoint: String,
  pub model_id: String,
  /// Sent as a bearer token when set
  pub api_key: Option<String>,
  pub timeout_secs: u64,
}

pub struct ConverseClient {
  client: Client,
  config: ConverseConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest<'a> {
  messages: [Message<'a>; 1],
  inference_config: &'a GenerationParams,
}

#[derive(Serialize)]
struct Message<'a> {
  role: &'static str,
  content: [TextBlock<'a>; 1],
}

#[derive(Serialize)]
struct TextBlock<'a> {
  text: &'a str,
}

#[derive(Deserialize)]
struct ConverseResponse {
  output: ConverseOutput,
}

#[derive(Deserialize)]
struct ConverseOutput {
  message: OutputMessage,
}

#[derive(Deserialize)]
struct OutputMessage {
  content: Vec<OutputBlock>,
}

#[derive(Deserialize)]
struct OutputBlock {
  #[serde(default)]
  text: Option<String>,
}

impl ConverseClient {
  pub fn new(config: ConverseConfig) -> Result<Self, GenerationError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| GenerationError::failed(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client, config })
  }

  fn url(&self) -> String {
    format!("{}/model/{}/converse", self.config.endpoint.trim_end_matches('/'), self.config.model_id)
  }

  async fn error_from_response(response: Response) -> GenerationError {
    let status = response.status();
    let header_type = response
      .headers()
      .get(ERROR_TYPE_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::to_string);
    let body = response.text().await.unwrap_or_default();

    let parsed: Option<Value> = serde_json::from_str(&body).ok();
    let body_type =
      parsed.as_ref().and_then(|v| v.get("__type")).and_then(Value::as_str).map(str::to_string);
    let message = parsed
      .as_ref()
      .and_then(|v| v.get("message").or_else(|| v.get("Message")))
      .and_then(Value::as_str)
      .map(str::to_string)
      .unwrap_or_else(|| if body.is_empty() { status.to_string() } else { body.clone() });

    let error_type = header_type.or(body_type).unwrap_or_default();
    error!(%status, %error_type, %message, "model API error");

    if status == StatusCode::TOO_MANY_REQUESTS || error_type.contains(THROTTLING) {
      GenerationError::rate_limited(message)
    } else if status == StatusCode::BAD_REQUEST || error_type.contains(VALIDATION) {
      GenerationError::invalid_request(message)
    } else {
      GenerationError::failed(message)
    }
  }
}

#[async_trait]
impl GenerationService for ConverseClient {
  fn model_id(&self) -> String {
    self.config.model_id.clone()
  }

  async fn generate(
    &self,
    prompt: &str,
    params: &GenerationParams,
  ) -> Result<GenerationOutput, GenerationError> {
    info!(model = %self.config.model_id, max_tokens = params.max_tokens, "calling model");

    let body = ConverseRequest {
      messages: [Message { role: "user", content: [TextBlock { text: prompt }] }],
      inference_config: params,
    };

    let mut request = self.client.post(self.url()).json(&body);
    if let Some(key) = &self.config.api_key {
      request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|e| {
      if e.is_timeout() {
        GenerationError::Timeout { seconds: self.config.timeout_secs }
      } else {
        GenerationError::failed(format!("request failed: {e}"))
      }
    })?;

    if !response.status().is_success() {
      return Err(Self::error_from_response(response).await);
    }

    let reply: ConverseResponse = response
      .json()
      .await
      .map_err(|e| GenerationError::failed(format!("unreadable model response: {e}")))?;

    let text = reply
      .output
      .message
      .content
      .into_iter()
      .next()
      .and_then(|block| block.text)
      .ok_or_else(|| GenerationError::failed("model response carried no text"))?;

    debug!(preview = %text.chars().take(200).collect::<String>(), "raw model reply");
    Ok(parse_reply(text))
  }
}

/// JSON object replies become structured output; anything else stays text
pub fn parse_reply(text: String) -> GenerationOutput {
  match serde_json::from_str::<Value>(strip_code_fence(&text)) {
    Ok(value @ Value::Object(_)) => GenerationOutput::Structured(value),
    _ => {
      warn!("model reply is not a JSON object, keeping raw text");
      GenerationOutput::RawText(text)
    }
  }
}

fn strip_code_fence(text: &str) -> &str {
  let trimmed = text.trim();
  let Some(rest) = trimmed.strip_prefix("```") else {
    return trimmed;
  };
  // Drop the language tag line, then the closing fence
  let body = rest.split_once('\n').map_or("", |(_, body)| body);
  body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
