use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

// Embedding and retrieval failures are not represented here: both
// degrade to a local fallback and never abort a chat turn.
#[derive(Error, Debug)]
pub enum ChatError {
  #[error("{0}")]
  BadRequest(String),
  #[error("{0} not configured")]
  ConfigMissing(&'static str),
  #[error("upstream returned {status}: {detail}")]
  Upstream { status: u16, detail: String },
  #[error("request timeout")]
  Timeout,
  #[error("no reply from model")]
  EmptyReply,
  #[error("{0}")]
  Internal(String),
}

impl ChatError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::ConfigMissing(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::Upstream { .. } | Self::EmptyReply => StatusCode::BAD_GATEWAY,
      Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
  }
}

impl IntoResponse for ChatError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      Self::BadRequest(message) => serde_json::json!({ "error": message }),
      Self::ConfigMissing(what) => serde_json::json!({
        "error": "Service not configured",
        "message": format!("{what} not configured"),
      }),
      Self::Upstream { status, detail } => serde_json::json!({
        "error": "API call failed",
        "status": status,
        "details": detail,
      }),
      Self::Timeout => serde_json::json!({ "error": "Request timeout" }),
      Self::EmptyReply => serde_json::json!({ "error": "No reply from AI model" }),
      Self::Internal(detail) => serde_json::json!({
        "error": "Internal server error",
        "details": detail,
      }),
    };
    (status, Json(body)).into_response()
  }
}
