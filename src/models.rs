use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
  pub role: String,
  pub content: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChatRequest {
  pub messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChatResponse {
  pub reply: String,
}

// Serializes directly as the OpenRouter chat-completions payload.
// Built once per inbound chat call, never mutated afterwards.
#[derive(Serialize, Clone, Debug)]
pub struct CompletionRequest {
  pub model: String,
  pub messages: Vec<ChatMessage>,
  pub max_tokens: u32,
  pub temperature: f32,
}
