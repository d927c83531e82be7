use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
  pub openrouter_api_key: Option<String>,
  pub huggingface_api_key: Option<String>,
  pub pinecone_api_key: Option<String>,
  pub pinecone_index: String,
  pub pinecone_host: String,
  pub openrouter_endpoint: String,
  pub huggingface_endpoint: String,
  pub chat_model: String,
  pub embed_model: String,
  pub site_url: String,
  pub site_title: String,
  pub bind_addr: String,
  pub probe_url: String,
  pub completion_timeout: Duration,
  pub embed_timeout: Duration,
  pub retrieval_timeout: Duration,
  pub probe_timeout: Duration,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      openrouter_api_key: None,
      huggingface_api_key: None,
      pinecone_api_key: None,
      pinecone_index: "albaker-portfolio".to_string(),
      pinecone_host: "https://albaker-portfolio.svc.pinecone.io".to_string(),
      openrouter_endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
      huggingface_endpoint: "https://api-inference.huggingface.co".to_string(),
      chat_model: "openai/gpt-3.5-turbo".to_string(),
      embed_model: "sentence-transformers/all-mpnet-base-v2".to_string(),
      site_url: "https://albaker-portfolio.vercel.app".to_string(),
      site_title: "Albaker Portfolio".to_string(),
      bind_addr: "127.0.0.1:8787".to_string(),
      probe_url: "https://httpbin.org/get".to_string(),
      completion_timeout: Duration::from_secs(25),
      embed_timeout: Duration::from_secs(8),
      retrieval_timeout: Duration::from_secs(8),
      probe_timeout: Duration::from_secs(3),
    }
  }
}

impl AppConfig {
  // Read once at startup; the value is immutable afterwards.
  pub fn from_env() -> Self {
    let mut config = Self::default();
    config.openrouter_api_key = env_nonempty("OPENROUTER_API_KEY");
    config.huggingface_api_key = env_nonempty("HUGGINGFACE_API_KEY");
    config.pinecone_api_key = env_nonempty("PINECONE_API_KEY");
    if let Some(index) = env_nonempty("PINECONE_INDEX_NAME") {
      config.pinecone_index = index;
    }
    config.pinecone_host = env_nonempty("PINECONE_HOST")
      .unwrap_or_else(|| format!("https://{}.svc.pinecone.io", config.pinecone_index));
    if let Some(model) = env_nonempty("CHAT_MODEL") {
      config.chat_model = model;
    }
    if let Some(model) = env_nonempty("EMBED_MODEL") {
      config.embed_model = model;
    }
    if let Some(url) = env_nonempty("SITE_URL") {
      config.site_url = url;
    }
    if let Some(title) = env_nonempty("SITE_TITLE") {
      config.site_title = title;
    }
    if let Some(addr) = env_nonempty("BIND_ADDR") {
      config.bind_addr = addr;
    }
    if let Some(secs) = env_nonempty("COMPLETION_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
      config.completion_timeout = Duration::from_secs(secs);
    }
    config
  }
}

// First 8 characters only, the full secret never leaves the process.
pub fn masked_prefix(key: Option<&str>) -> String {
  match key {
    Some(value) => format!("{}...", value.chars().take(8).collect::<String>()),
    None => "not set".to_string(),
  }
}

fn env_nonempty(name: &str) -> Option<String> {
  std::env::var(name)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_deployment() {
    let config = AppConfig::default();
    assert_eq!(config.pinecone_index, "albaker-portfolio");
    assert_eq!(config.chat_model, "openai/gpt-3.5-turbo");
    assert_eq!(config.completion_timeout, Duration::from_secs(25));
    assert!(config.openrouter_api_key.is_none());
  }

  #[test]
  fn masked_prefix_hides_secret_tail() {
    assert_eq!(masked_prefix(Some("sk-or-v1-abcdef123456")), "sk-or-v1...");
    assert_eq!(masked_prefix(None), "not set");
  }

  #[test]
  fn masked_prefix_handles_short_keys() {
    assert_eq!(masked_prefix(Some("abc")), "abc...");
  }
}
