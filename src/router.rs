use std::net::TcpListener;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::completion::CompletionClient;
use crate::config::{masked_prefix, AppConfig};
use crate::embedding::Embedder;
use crate::error::ChatError;
use crate::models::{ChatMessage, ChatResponse};
use crate::prompt;
use crate::retrieval::Retriever;

pub struct RouterState {
  pub started_at: Instant,
  pub config: AppConfig,
  pub embedder: Embedder,
  pub retriever: Retriever,
  pub completion: CompletionClient,
}

impl RouterState {
  pub fn new(config: AppConfig) -> Self {
    Self {
      started_at: Instant::now(),
      embedder: Embedder::new(&config),
      retriever: Retriever::new(&config),
      completion: CompletionClient::new(&config),
      config,
    }
  }
}

pub async fn run_router(listener: TcpListener, state: RouterState) -> anyhow::Result<()> {
  listener.set_nonblocking(true)?;
  let listener = tokio::net::TcpListener::from_std(listener)?;
  axum::serve(listener, router(state)).await?;
  Ok(())
}

pub fn router(state: RouterState) -> Router {
  Router::new()
    .route("/chat", post(chat).get(chat_probe))
    .route("/health", get(health))
    .layer(
      CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
    )
    .with_state(Arc::new(state))
}

async fn chat(State(state): State<Arc<RouterState>>, body: String) -> Response {
  match answer(&state, &body).await {
    Ok(reply) => {
      tracing::info!("reply ready, {} chars", reply.len());
      let mut response = (StatusCode::OK, Json(ChatResponse { reply })).into_response();
      // The answer depends on mutable external state, never cache it.
      response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
      );
      response
    }
    Err(err) => err.into_response(),
  }
}

async fn answer(state: &RouterState, body: &str) -> Result<String, ChatError> {
  let messages = parse_messages(body)?;
  tracing::info!("processing {} messages", messages.len());
  let question = last_user_content(&messages)?;

  if state.config.openrouter_api_key.is_none() {
    return Err(ChatError::ConfigMissing("OpenRouter API key"));
  }

  let context = state.retriever.retrieve(&state.embedder, &question).await;
  let request = prompt::compose(&state.config.chat_model, &context, &messages);
  state.completion.complete(&request).await
}

fn parse_messages(body: &str) -> Result<Vec<ChatMessage>, ChatError> {
  let value: serde_json::Value = serde_json::from_str(body)
    .map_err(|err| ChatError::BadRequest(format!("Invalid JSON: {err}")))?;
  let Some(items) = value.get("messages").and_then(|m| m.as_array()) else {
    return Err(ChatError::BadRequest("Missing or invalid messages array".to_string()));
  };
  if items.is_empty() {
    return Err(ChatError::BadRequest("Missing or invalid messages array".to_string()));
  }
  serde_json::from_value(serde_json::Value::Array(items.clone()))
    .map_err(|_| ChatError::BadRequest("Missing or invalid messages array".to_string()))
}

fn last_user_content(messages: &[ChatMessage]) -> Result<String, ChatError> {
  messages
    .iter()
    .rev()
    .find(|m| m.role == "user")
    .map(|m| m.content.trim().to_string())
    .filter(|content| !content.is_empty())
    .ok_or_else(|| ChatError::BadRequest("Missing user message content".to_string()))
}

async fn chat_probe(State(state): State<Arc<RouterState>>) -> Json<serde_json::Value> {
  Json(serde_json::json!({
    "message": "Chat API is running",
    "timestamp": chrono::Utc::now().to_rfc3339(),
    "has_api_key": state.config.openrouter_api_key.is_some(),
  }))
}

async fn health(State(state): State<Arc<RouterState>>) -> Response {
  let config = &state.config;
  let all_configured = config.openrouter_api_key.is_some()
    && config.huggingface_api_key.is_some()
    && config.pinecone_api_key.is_some();

  let report = serde_json::json!({
    "status": if all_configured { "ok" } else { "degraded" },
    "timestamp": chrono::Utc::now().to_rfc3339(),
    "uptime_ms": state.started_at.elapsed().as_millis() as u64,
    "services": {
      "openrouter": {
        "configured": config.openrouter_api_key.is_some(),
        "key_prefix": masked_prefix(config.openrouter_api_key.as_deref()),
      },
      "huggingface": {
        "configured": config.huggingface_api_key.is_some(),
        "key_prefix": masked_prefix(config.huggingface_api_key.as_deref()),
      },
      "pinecone": {
        "configured": config.pinecone_api_key.is_some(),
        "key_prefix": masked_prefix(config.pinecone_api_key.as_deref()),
        "index_name": config.pinecone_index,
      },
    },
    "connectivity": connectivity_probe(config).await,
  });

  let status = if all_configured { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
  (status, Json(report)).into_response()
}

// Reaches out without spending any API key quota.
async fn connectivity_probe(config: &AppConfig) -> serde_json::Value {
  let client = match reqwest::Client::builder().timeout(config.probe_timeout).build() {
    Ok(client) => client,
    Err(err) => return serde_json::json!({ "external": false, "error": err.to_string() }),
  };
  match client.get(&config.probe_url).send().await {
    Ok(response) => serde_json::json!({
      "external": response.status().is_success(),
      "status": response.status().as_u16(),
    }),
    Err(err) => serde_json::json!({ "external": false, "error": err.to_string() }),
  }
}
