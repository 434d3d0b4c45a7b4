//! Request context and middleware for the PACIFIC REST API
//!
//! Every request gets a [`RequestContext`] carrying a fresh request id and
//! the request metadata. Handlers pull it out of the extensions and log
//! through it so all lines for one request share the id.

use axum::{
  extract::Request,
  http::{HeaderMap, Method, Uri},
  middleware::Next,
  response::Response,
};
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::profiles::DEFAULT_USER_ID;

pub const USER_ID_HEADER: &str = "user-id";

#[derive(Clone, Debug)]
pub struct RequestContext {
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
  pub headers: HeaderMap,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri, headers }
  }

  pub fn user_agent(&self) -> &str {
    self.headers.get("user-agent").and_then(|v| v.to_str().ok()).unwrap_or("none")
  }

  /// Value of the `user-id` header, or the shared default user
  pub fn user_id(&self) -> &str {
    self
      .headers
      .get(USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|id| !id.is_empty())
      .unwrap_or(DEFAULT_USER_ID)
  }

  pub fn log_info(&self, message: &str) {
    info!(request_id = %self.request_id, method = %self.method, path = self.uri.path(), "{message}");
  }

  pub fn log_warn(&self, message: &str) {
    warn!(request_id = %self.request_id, method = %self.method, path = self.uri.path(), "{message}");
  }

  pub fn log_error(&self, message: &str) {
    error!(request_id = %self.request_id, method = %self.method, path = self.uri.path(), "{message}");
  }

  pub fn log_request_start(&self) {
    info!(
      request_id = %self.request_id,
      method = %self.method,
      path = self.uri.path(),
      user_agent = self.user_agent(),
      "request started"
    );
  }

  pub fn log_request_complete(&self, status: u16, duration_ms: f64) {
    info!(
      request_id = %self.request_id,
      method = %self.method,
      path = self.uri.path(),
      status,
      duration_ms,
      "request completed"
    );
  }
}

/// Inject a [`RequestContext`] into every request and time it
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
  let context =
    RequestContext::new(request.method().clone(), request.uri().clone(), request.headers().clone());

  let start_time = Instant::now();
  context.log_request_start();
  request.extensions_mut().insert(context.clone());

  let response = next.run(request).await;

  let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
  context.log_request_complete(response.status().as_u16(), duration_ms);

  response
}
