use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::models::ChatMessage;

pub const GREETING: &str = "\u{1F44B} Hi! I'm Albaker's AI assistant. Ask me about him!";

pub fn init_db(path: &Path) -> anyhow::Result<Connection> {
  let conn = Connection::open(path)?;
  conn.execute_batch(
    "
    CREATE TABLE IF NOT EXISTS history (
      id TEXT PRIMARY KEY,
      created_at TEXT NOT NULL,
      position INTEGER NOT NULL,
      role TEXT NOT NULL,
      content TEXT NOT NULL
    );
    ",
  )?;
  Ok(conn)
}

pub fn load_history(conn: &Connection) -> anyhow::Result<Vec<ChatMessage>> {
  let mut stmt = conn.prepare("SELECT role, content FROM history ORDER BY position ASC")?;
  let rows = stmt.query_map([], |row| {
    Ok(ChatMessage { role: row.get(0)?, content: row.get(1)? })
  })?;

  let mut messages = Vec::new();
  for row in rows {
    messages.push(row?);
  }
  Ok(messages)
}

pub fn append_message(conn: &Connection, role: &str, content: &str) -> anyhow::Result<()> {
  let position: i64 = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
  conn.execute(
    "INSERT INTO history (id, created_at, position, role, content) VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      uuid::Uuid::new_v4().to_string(),
      Utc::now().to_rfc3339(),
      position,
      role,
      content
    ],
  )?;
  Ok(())
}

pub fn clear_history(conn: &Connection) -> anyhow::Result<()> {
  conn.execute("DELETE FROM history", [])?;
  Ok(())
}

pub fn seed_greeting(conn: &Connection) -> anyhow::Result<()> {
  if load_history(conn)?.is_empty() {
    append_message(conn, "assistant", GREETING)?;
  }
  Ok(())
}
