use std::net::TcpListener;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use portfolio_assistant::config::AppConfig;
use portfolio_assistant::router::{run_router, RouterState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let config = AppConfig::from_env();
  if config.openrouter_api_key.is_none() {
    tracing::warn!("OPENROUTER_API_KEY not set, chat requests will fail");
  }
  if config.huggingface_api_key.is_none() {
    tracing::warn!("HUGGINGFACE_API_KEY not set, queries use the local embedding");
  }
  if config.pinecone_api_key.is_none() {
    tracing::warn!("PINECONE_API_KEY not set, retrieval serves the fallback bio");
  }

  let listener = TcpListener::bind(&config.bind_addr)
    .with_context(|| format!("failed to bind {}", config.bind_addr))?;
  tracing::info!("listening on {}", listener.local_addr()?);

  run_router(listener, RouterState::new(config)).await
}
