use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::config::AppConfig;
use crate::error::ChatError;
use crate::models::CompletionRequest;

const DETAIL_LIMIT: usize = 500;

pub struct CompletionClient {
  client: reqwest::Client,
  endpoint: String,
  api_key: Option<String>,
  site_url: String,
  site_title: String,
}

impl CompletionClient {
  pub fn new(config: &AppConfig) -> Self {
    let client = reqwest::Client::builder()
      .timeout(config.completion_timeout)
      .build()
      .expect("failed to build HTTP client");
    Self {
      client,
      endpoint: config.openrouter_endpoint.clone(),
      api_key: config.openrouter_api_key.clone(),
      site_url: config.site_url.clone(),
      site_title: config.site_title.clone(),
    }
  }

  // One attempt per user turn; retrying is the caller's decision.
  pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ChatError> {
    let key = self
      .api_key
      .as_deref()
      .ok_or(ChatError::ConfigMissing("OpenRouter API key"))?;

    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&format!("Bearer {key}"))
      .map_err(|err| ChatError::Internal(err.to_string()))?;
    headers.insert(AUTHORIZATION, auth);
    if let Ok(referer) = HeaderValue::from_str(&self.site_url) {
      headers.insert("HTTP-Referer", referer);
    }
    if let Ok(title) = HeaderValue::from_str(&self.site_title) {
      headers.insert("X-Title", title);
    }

    let response = self
      .client
      .post(&self.endpoint)
      .headers(headers)
      .json(request)
      .send()
      .await
      .map_err(|err| {
        if err.is_timeout() {
          ChatError::Timeout
        } else {
          ChatError::Internal(format!("completion request failed: {err}"))
        }
      })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      tracing::error!("completion upstream error {status}: {body}");
      return Err(ChatError::Upstream {
        status: status.as_u16(),
        detail: truncate_detail(&body),
      });
    }

    let body: serde_json::Value = response
      .json()
      .await
      .map_err(|err| ChatError::Internal(format!("malformed completion response: {err}")))?;
    let reply = body["choices"][0]["message"]["content"].as_str().unwrap_or("");
    if reply.is_empty() {
      return Err(ChatError::EmptyReply);
    }
    Ok(reply.to_string())
  }
}

fn truncate_detail(body: &str) -> String {
  body.chars().take(DETAIL_LIMIT).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::prompt;

  fn client_for(server: &mockito::Server, key: Option<&str>) -> CompletionClient {
    let config = AppConfig {
      openrouter_api_key: key.map(str::to_string),
      openrouter_endpoint: server.url(),
      ..AppConfig::default()
    };
    CompletionClient::new(&config)
  }

  fn request() -> CompletionRequest {
    prompt::compose(
      "openai/gpt-3.5-turbo",
      "ctx",
      &[crate::models::ChatMessage { role: "user".to_string(), content: "hi".to_string() }],
    )
  }

  #[test]
  fn detail_is_truncated_to_five_hundred_chars() {
    let long = "x".repeat(2000);
    assert_eq!(truncate_detail(&long).len(), 500);
    assert_eq!(truncate_detail("short"), "short");
  }

  #[tokio::test]
  async fn missing_key_is_reported_before_any_call() {
    let server = mockito::Server::new_async().await;
    let client = client_for(&server, None);
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, ChatError::ConfigMissing("OpenRouter API key")));
  }

  #[tokio::test]
  async fn successful_reply_is_extracted() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
      "choices": [ { "message": { "role": "assistant", "content": "Albaker built FootPrints." } } ]
    });
    let mock = server
      .mock("POST", "/")
      .match_header("authorization", "Bearer test-key")
      .match_header("x-title", "Albaker Portfolio")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body.to_string())
      .create_async()
      .await;

    let client = client_for(&server, Some("test-key"));
    let reply = client.complete(&request()).await.expect("reply");
    mock.assert_async().await;
    assert_eq!(reply, "Albaker built FootPrints.");
  }

  #[tokio::test]
  async fn non_success_status_maps_to_upstream_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/")
      .with_status(429)
      .with_body("rate limited")
      .create_async()
      .await;

    let client = client_for(&server, Some("test-key"));
    let err = client.complete(&request()).await.unwrap_err();
    match err {
      ChatError::Upstream { status, detail } => {
        assert_eq!(status, 429);
        assert_eq!(detail, "rate limited");
      }
      other => panic!("expected upstream error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn missing_content_maps_to_empty_reply() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({ "choices": [ { "message": { "role": "assistant" } } ] });
    let _mock = server
      .mock("POST", "/")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body.to_string())
      .create_async()
      .await;

    let client = client_for(&server, Some("test-key"));
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyReply));
  }
}
