use std::collections::HashSet;

use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

pub const EMBED_DIM: usize = 768;

// Fixed slots at the tail of the vector. The hashed scatter below also
// lands in this range occasionally; the slots are additive, not reserved.
const CATEGORY_BASE: usize = 750;
const STATS_BASE: usize = 760;
const QUESTION_SLOT: usize = 764;

const KEYWORD_BOOST: &[&str] = &[
  "albaker", "solfa", "footprints", "hta", "flutter", "react", "nextjs",
  "python", "tensorflow", "ml", "e-learning", "aswan", "leadership",
];

const TECHNICAL: &[&str] = &[
  "code", "programming", "ml", "model", "python", "react", "flutter",
  "tensorflow", "api", "stack", "developer",
];
const EDUCATION: &[&str] = &[
  "education", "school", "academy", "learning", "student", "levels", "study",
];
const PERSONAL: &[&str] = &["who", "about", "background", "hobby", "location", "live"];
const PROJECT: &[&str] = &["project", "built", "build", "app", "system", "portfolio", "develop"];
const CONTACT: &[&str] = &["contact", "email", "reach", "github", "linkedin", "hire"];

// Order is fixed: technical, education, personal, project, contact.
const CATEGORIES: [&[&str]; 5] = [TECHNICAL, EDUCATION, PERSONAL, PROJECT, CONTACT];

pub struct Embedder {
  client: reqwest::Client,
  endpoint: String,
  model: String,
  api_key: Option<String>,
}

#[derive(Serialize)]
struct HfEmbedRequest<'a> {
  inputs: &'a str,
  options: HfOptions,
}

#[derive(Serialize)]
struct HfOptions {
  wait_for_model: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HfEmbedResponse {
  Nested(Vec<Vec<f32>>),
  Direct(Vec<f32>),
}

impl Embedder {
  pub fn new(config: &AppConfig) -> Self {
    let client = reqwest::Client::builder()
      .timeout(config.embed_timeout)
      .build()
      .expect("failed to build HTTP client");
    Self {
      client,
      endpoint: config.huggingface_endpoint.clone(),
      model: config.embed_model.clone(),
      api_key: config.huggingface_api_key.clone(),
    }
  }

  // Never fails outward: any remote problem degrades to the local
  // deterministic embedding so the chat turn keeps working.
  pub async fn embed(&self, text: &str) -> Vec<f32> {
    match self.remote_embed(text).await {
      Ok(vector) => fit_dimension(vector),
      Err(err) => {
        tracing::warn!("embedding fallback: {err}");
        local_embedding(text)
      }
    }
  }

  async fn remote_embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
    let key = self
      .api_key
      .as_deref()
      .ok_or_else(|| anyhow::anyhow!("Hugging Face API key not set"))?;
    let url = format!(
      "{}/models/{}/pipeline/feature-extraction",
      self.endpoint, self.model
    );
    let request = HfEmbedRequest {
      inputs: text,
      options: HfOptions { wait_for_model: true },
    };

    let response = self
      .client
      .post(&url)
      .header(AUTHORIZATION, format!("Bearer {key}"))
      .json(&request)
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      anyhow::bail!("Hugging Face returned {status}: {body}");
    }

    let parsed: HfEmbedResponse = response.json().await?;
    let vector = match parsed {
      HfEmbedResponse::Nested(rows) => rows
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty embedding response"))?,
      HfEmbedResponse::Direct(vector) => vector,
    };
    anyhow::ensure!(
      vector.len() >= EMBED_DIM,
      "unexpected embedding dimension {}",
      vector.len()
    );
    Ok(vector)
  }
}

// Deterministic pseudo-feature-extractor, no randomness anywhere: the
// same text always produces the same vector.
pub fn local_embedding(text: &str) -> Vec<f32> {
  let mut vector = vec![0.0f32; EMBED_DIM];
  let lowered = text.to_lowercase();

  for (i, ch) in lowered.chars().enumerate() {
    let code = ch as u32;
    let idx = i as u32;
    let p1 = (code.wrapping_mul(31).wrapping_add(idx.wrapping_mul(7))) as usize % EMBED_DIM;
    let p2 = (code.wrapping_mul(131).wrapping_add(idx.wrapping_mul(13))) as usize % EMBED_DIM;
    let p3 = (code.wrapping_mul(313).wrapping_add(idx.wrapping_mul(17))) as usize % EMBED_DIM;
    vector[p1] += (code as f32 * 0.1).sin();
    vector[p2] += (code as f32 * 0.05).cos();
    vector[p3] += (code as f32 * 0.01).tanh();
  }

  let words: Vec<&str> = lowered.split_whitespace().collect();
  for (rank, word) in words.iter().enumerate() {
    // Earlier words weigh more, longer words weigh more.
    let mut weight = (word.len() as f32 + 1.0).ln() / (rank as f32 + 1.0);
    if KEYWORD_BOOST.contains(word) {
      weight *= 2.5;
    }
    vector[str_hash(word, 31) % EMBED_DIM] += weight;
    vector[str_hash(word, 53) % EMBED_DIM] += weight * 0.6;
    vector[str_hash(word, 131) % EMBED_DIM] += weight * 0.3;
  }

  for pair in words.windows(2) {
    vector[str_hash(&pair.join(" "), 53) % EMBED_DIM] += 0.4;
  }
  for triple in words.windows(3) {
    vector[str_hash(&triple.join(" "), 97) % EMBED_DIM] += 0.25;
  }

  for (slot, keywords) in CATEGORIES.iter().enumerate() {
    let hits = keywords.iter().filter(|k| lowered.contains(**k)).count();
    vector[CATEGORY_BASE + slot] += hits as f32 * 0.5;
  }

  let word_count = words.len();
  vector[STATS_BASE] += (lowered.len() as f32 / 1000.0).min(1.0);
  vector[STATS_BASE + 1] += (word_count as f32 / 100.0).min(1.0);
  if word_count > 0 {
    let total_len: usize = words.iter().map(|w| w.len()).sum();
    vector[STATS_BASE + 2] += total_len as f32 / word_count as f32 / 10.0;
    let distinct = words.iter().copied().collect::<HashSet<_>>().len();
    vector[STATS_BASE + 3] += distinct as f32 / word_count as f32;
  }

  if lowered.contains('?') {
    vector[QUESTION_SLOT] += 1.0;
  }

  normalize(vector)
}

// Vectors shorter than EMBED_DIM are zero padded, longer ones truncated.
pub fn fit_dimension(mut vector: Vec<f32>) -> Vec<f32> {
  vector.resize(EMBED_DIM, 0.0);
  vector
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
  let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
  if norm > 0.0 {
    for v in &mut vector {
      *v /= norm;
    }
  }
  vector
}

fn str_hash(s: &str, base: u32) -> usize {
  let mut h: u32 = 0;
  for b in s.bytes() {
    h = h.wrapping_mul(base).wrapping_add(u32::from(b));
  }
  h as usize
}
