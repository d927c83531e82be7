use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::embedding::Embedder;

const TOP_K: usize = 3;
const MIN_SCORE: f32 = 0.5;

// Served whenever the index is unreachable, unconfigured, or nothing
// clears the similarity threshold. Retrieval never fails a chat turn.
pub const FALLBACK_BIO: &str = "Albaker Ahmed is a full stack developer (Next.js, React, \
Flutter) and ML engineer (Python, TensorFlow) based in Aswan, Egypt. He led the team behind \
the SOLFA ML system with 4+ internal models, built FootPrints, an AI-powered Flutter shopping \
app, and the HTA e-learning platform for students with disabilities. He studies Leadership and \
A-Levels (Math, CS, Physics) at the African Leadership Academy (2023-2025). Contact: \
aali23@alastudents.org, github.com/albaker, linkedin.com/in/albaker.";

pub struct Retriever {
  client: reqwest::Client,
  host: String,
  api_key: Option<String>,
}

#[derive(Serialize)]
struct QueryRequest {
  vector: Vec<f32>,
  #[serde(rename = "topK")]
  top_k: usize,
  #[serde(rename = "includeMetadata")]
  include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
  #[serde(default)]
  matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
  #[serde(default)]
  score: f32,
  #[serde(default)]
  metadata: Option<MatchMetadata>,
}

#[derive(Deserialize)]
struct MatchMetadata {
  #[serde(default)]
  text: String,
}

impl Retriever {
  pub fn new(config: &AppConfig) -> Self {
    let client = reqwest::Client::builder()
      .timeout(config.retrieval_timeout)
      .build()
      .expect("failed to build HTTP client");
    Self {
      client,
      host: config.pinecone_host.clone(),
      api_key: config.pinecone_api_key.clone(),
    }
  }

  pub async fn retrieve(&self, embedder: &Embedder, query: &str) -> String {
    match self.query_index(embedder, query).await {
      Ok(passages) if !passages.is_empty() => passages.join("\n\n"),
      Ok(_) => {
        tracing::debug!("no passage above threshold, serving fallback bio");
        FALLBACK_BIO.to_string()
      }
      Err(err) => {
        tracing::warn!("context retrieval failed: {err}");
        FALLBACK_BIO.to_string()
      }
    }
  }

  async fn query_index(&self, embedder: &Embedder, query: &str) -> anyhow::Result<Vec<String>> {
    let key = self
      .api_key
      .as_deref()
      .ok_or_else(|| anyhow::anyhow!("Pinecone API key not set"))?;
    let vector = embedder.embed(query).await;

    let response = self
      .client
      .post(format!("{}/query", self.host))
      .header("Api-Key", key)
      .json(&QueryRequest { vector, top_k: TOP_K, include_metadata: true })
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      anyhow::bail!("index query returned {status}: {body}");
    }

    let parsed: QueryResponse = response.json().await?;
    Ok(select_passages(parsed.matches))
  }
}

fn select_passages(mut matches: Vec<QueryMatch>) -> Vec<String> {
  matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
  matches
    .into_iter()
    .filter(|m| m.score > MIN_SCORE)
    .filter_map(|m| m.metadata.map(|meta| meta.text))
    .filter(|text| !text.trim().is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scored(score: f32, text: &str) -> QueryMatch {
    QueryMatch {
      score,
      metadata: Some(MatchMetadata { text: text.to_string() }),
    }
  }

  #[test]
  fn select_passages_filters_below_threshold() {
    let passages = select_passages(vec![scored(0.9, "a"), scored(0.5, "b"), scored(0.2, "c")]);
    assert_eq!(passages, vec!["a".to_string()]);
  }

  #[test]
  fn select_passages_orders_by_descending_score() {
    let passages = select_passages(vec![scored(0.6, "low"), scored(0.9, "high"), scored(0.7, "mid")]);
    assert_eq!(passages, vec!["high".to_string(), "mid".to_string(), "low".to_string()]);
  }

  #[test]
  fn select_passages_skips_missing_or_blank_text() {
    let empty = QueryMatch { score: 0.9, metadata: None };
    let passages = select_passages(vec![empty, scored(0.8, "  "), scored(0.7, "kept")]);
    assert_eq!(passages, vec!["kept".to_string()]);
  }

  #[tokio::test]
  async fn missing_index_key_serves_fallback_bio() {
    let config = AppConfig::default();
    let retriever = Retriever::new(&config);
    let embedder = Embedder::new(&config);
    let context = retriever.retrieve(&embedder, "who is albaker?").await;
    assert_eq!(context, FALLBACK_BIO);
  }

  #[tokio::test]
  async fn index_error_serves_fallback_bio() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/query")
      .with_status(500)
      .with_body("index unavailable")
      .create_async()
      .await;

    let config = AppConfig {
      pinecone_api_key: Some("pc-key".to_string()),
      pinecone_host: server.url(),
      ..AppConfig::default()
    };
    let retriever = Retriever::new(&config);
    let embedder = Embedder::new(&config);
    let context = retriever.retrieve(&embedder, "who is albaker?").await;

    mock.assert_async().await;
    assert_eq!(context, FALLBACK_BIO);
  }

  #[tokio::test]
  async fn matches_above_threshold_are_joined_score_descending() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
      "matches": [
        { "score": 0.61, "metadata": { "text": "second passage" } },
        { "score": 0.92, "metadata": { "text": "first passage" } },
        { "score": 0.31, "metadata": { "text": "dropped passage" } },
      ]
    });
    let _mock = server
      .mock("POST", "/query")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body.to_string())
      .create_async()
      .await;

    let config = AppConfig {
      pinecone_api_key: Some("pc-key".to_string()),
      pinecone_host: server.url(),
      ..AppConfig::default()
    };
    let retriever = Retriever::new(&config);
    let embedder = Embedder::new(&config);
    let context = retriever.retrieve(&embedder, "projects?").await;
    assert_eq!(context, "first passage\n\nsecond passage");
  }

  #[tokio::test]
  async fn all_matches_below_threshold_serve_fallback_bio() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
      "matches": [
        { "score": 0.42, "metadata": { "text": "weak match" } },
      ]
    });
    let _mock = server
      .mock("POST", "/query")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body.to_string())
      .create_async()
      .await;

    let config = AppConfig {
      pinecone_api_key: Some("pc-key".to_string()),
      pinecone_host: server.url(),
      ..AppConfig::default()
    };
    let retriever = Retriever::new(&config);
    let embedder = Embedder::new(&config);
    let context = retriever.retrieve(&embedder, "unrelated question").await;
    assert_eq!(context, FALLBACK_BIO);
  }
}
