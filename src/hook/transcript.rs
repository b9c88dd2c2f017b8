//! Last-assistant-message extraction from a JSON Lines transcript.
//!
//! Used when the hook event does not carry the message itself. Each line is
//! one message object, either bare (`{"role": "assistant", "content": ...}`)
//! or wrapped (`{"type": "assistant", "message": {...}}`). Content may be a
//! plain string or a list of blocks, of which only `text` blocks count.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde_json::Value;

/// Text of the last assistant message in the transcript, or `None` if the
/// transcript is unreadable or has no assistant message.
pub fn last_assistant_message(path: &Path) -> Option<String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read transcript {}: {}", path.display(), e);
            return None;
        }
    };
    let message = last_assistant_in(&content);
    if message.is_none() {
        debug!("No assistant message found in {}", path.display());
    }
    message
}

/// Scan JSON Lines content from the end for the last assistant message
pub fn last_assistant_in(content: &str) -> Option<String> {
    content
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .find_map(|entry| assistant_text(&entry))
}

fn assistant_text(entry: &Value) -> Option<String> {
    let message = entry.get("message").unwrap_or(entry);
    let is_assistant = message.get("role").and_then(Value::as_str) == Some("assistant")
        || entry.get("type").and_then(Value::as_str) == Some("assistant");
    if !is_assistant {
        return None;
    }

    match message.get("content")? {
        Value::String(text) => Some(text.clone()),
        Value::Array(blocks) => {
            let texts: Vec<&str> = blocks
                .iter()
                .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect();
            if texts.is_empty() { None } else { Some(texts.join("\n")) }
        }
        _ => None,
    }
}
