use std::io::{self, BufRead, Write};

use anyhow::Context;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use portfolio_assistant::models::{ChatMessage, ChatRequest, ChatResponse};
use portfolio_assistant::storage;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8787";
const GENERIC_ERROR: &str =
  "\u{26A0}\u{FE0F} Sorry, I'm having trouble responding. Please try again later.";
const TIMEOUT_ERROR: &str =
  "\u{26A0}\u{FE0F} Request timeout. Please try a shorter question.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(io::stderr)
    .init();

  let dirs = directories::ProjectDirs::from("dev", "albaker", "portfolio-assistant")
    .context("no home directory available")?;
  std::fs::create_dir_all(dirs.data_dir())?;
  let conn = storage::init_db(&dirs.data_dir().join("widget-history.sqlite3"))?;
  storage::seed_greeting(&conn)?;

  let server = std::env::var("ASSISTANT_URL").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
  let client = reqwest::Client::new();

  let mut messages = storage::load_history(&conn)?;
  for message in &messages {
    render(message);
  }
  println!("{}", "Type a question, /reset to clear history, /quit to exit.".dimmed());

  let stdin = io::stdin();
  loop {
    print!("{} ", ">".blue().bold());
    io::stdout().flush()?;

    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
      break;
    }
    let input = line.trim();
    if input.is_empty() {
      continue;
    }
    if input == "/quit" {
      break;
    }
    if input == "/reset" {
      storage::clear_history(&conn)?;
      storage::seed_greeting(&conn)?;
      messages = storage::load_history(&conn)?;
      println!("{}", "History cleared.".dimmed());
      continue;
    }

    // Optimistic append: the user turn is persisted before the reply.
    storage::append_message(&conn, "user", input)?;
    messages.push(ChatMessage { role: "user".to_string(), content: input.to_string() });

    println!("{}", "thinking...".dimmed());
    let reply = match request_reply(&client, &server, &messages).await {
      Ok(reply) => reply,
      Err(friendly) => friendly,
    };
    storage::append_message(&conn, "assistant", &reply)?;
    let message = ChatMessage { role: "assistant".to_string(), content: reply };
    render(&message);
    messages.push(message);
  }
  Ok(())
}

fn render(message: &ChatMessage) {
  match message.role.as_str() {
    "assistant" => println!("{} {}", "assistant".magenta().bold(), message.content),
    _ => println!("{} {}", "you".blue().bold(), message.content),
  }
}

// Failures come back as one of a few short user-facing strings; the raw
// detail only ever goes to the log.
async fn request_reply(
  client: &reqwest::Client,
  server: &str,
  messages: &[ChatMessage],
) -> Result<String, String> {
  let response = client
    .post(format!("{server}/chat"))
    .json(&ChatRequest { messages: messages.to_vec() })
    .send()
    .await
    .map_err(|err| {
      tracing::error!("chat request failed: {err}");
      GENERIC_ERROR.to_string()
    })?;

  let status = response.status();
  if !status.is_success() {
    let body: serde_json::Value = response.json().await.unwrap_or_default();
    tracing::error!("chat error {status}: {body}");
    return Err(friendly_error(status.as_u16(), &body));
  }

  let body: ChatResponse = response.json().await.map_err(|err| {
    tracing::error!("malformed chat response: {err}");
    GENERIC_ERROR.to_string()
  })?;
  if body.reply.is_empty() {
    return Err(GENERIC_ERROR.to_string());
  }
  Ok(body.reply)
}

fn friendly_error(status: u16, body: &serde_json::Value) -> String {
  match status {
    500 => body["message"]
      .as_str()
      .map(|message| format!("\u{26A0}\u{FE0F} Configuration issue: {message}"))
      .unwrap_or_else(|| GENERIC_ERROR.to_string()),
    504 => TIMEOUT_ERROR.to_string(),
    400 => body["error"]
      .as_str()
      .map(|message| format!("\u{26A0}\u{FE0F} {message}"))
      .unwrap_or_else(|| GENERIC_ERROR.to_string()),
    _ => GENERIC_ERROR.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn config_failures_name_the_missing_capability() {
    let body = serde_json::json!({
      "error": "Service not configured",
      "message": "OpenRouter API key not configured",
    });
    assert_eq!(
      friendly_error(500, &body),
      "\u{26A0}\u{FE0F} Configuration issue: OpenRouter API key not configured"
    );
  }

  #[test]
  fn timeouts_suggest_a_shorter_question() {
    let body = serde_json::json!({ "error": "Request timeout" });
    assert_eq!(friendly_error(504, &body), TIMEOUT_ERROR);
  }

  #[test]
  fn validation_errors_surface_verbatim() {
    let body = serde_json::json!({ "error": "Missing or invalid messages array" });
    assert_eq!(
      friendly_error(400, &body),
      "\u{26A0}\u{FE0F} Missing or invalid messages array"
    );
  }

  #[test]
  fn anything_else_degrades_to_the_generic_string() {
    let body = serde_json::json!({ "error": "API call failed", "status": 429 });
    assert_eq!(friendly_error(502, &body), GENERIC_ERROR);
    assert_eq!(friendly_error(500, &serde_json::json!({})), GENERIC_ERROR);
  }
}
