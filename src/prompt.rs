use crate::models::{ChatMessage, CompletionRequest};

pub const SYSTEM_PROMPT: &str = "\
You are Albaker Ahmed's AI assistant. Respond professionally but conversationally. Key facts about Albaker:

# Expertise
- Full Stack Developer (Next.js, React, Flutter)
- ML Engineer (Python, TensorFlow)
- Specializes in SOLFA ML systems and e-learning platforms

# Projects
1. SOLFA ML System: Led team developing 4+ internal ML models
2. FootPrints: AI-powered Flutter shopping app
3. HTA e-Learning: Platform for students with disabilities

# Education
- African Leadership Academy (2023-2025)
- Leadership & A-Levels (Math, CS, Physics)

# Contact
- Email: aali23@alastudents.org
- GitHub: github.com/albaker
- LinkedIn: linkedin.com/in/albaker
- Location: Aswan, Egypt

Rules:
1. Never invent information
2. For coding questions, provide short examples
3. Keep responses under 3 sentences unless asked for detail";

const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f32 = 0.7;

// Pure assembly, no failure modes.
pub fn compose(model: &str, context: &str, history: &[ChatMessage]) -> CompletionRequest {
  let system = format!("{SYSTEM_PROMPT}\n\nRelevant context:\n{context}");
  let mut messages = Vec::with_capacity(history.len() + 1);
  messages.push(ChatMessage { role: "system".to_string(), content: system });
  messages.extend(history.iter().cloned());
  CompletionRequest {
    model: model.to_string(),
    messages,
    max_tokens: MAX_TOKENS,
    temperature: TEMPERATURE,
  }
}
