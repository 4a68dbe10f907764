// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line scanner for the agent's stdout wire format.
//!
//! Each stdout line is expected to be one JSON object whose `type` field
//! selects the event. Aliases exist for forward/backward compatibility
//! (`system` for `init`, `end` for `result`, ...); lines that are not
//! JSON objects or carry an unknown type are skipped silently.

use cosa_core::AgentEvent;
use serde_json::Value;

fn str_field<'a>(json: &'a Value, key: &str) -> Option<&'a str> {
    json.get(key).and_then(Value::as_str)
}

/// Best-effort extraction of message text: `text` first, then `content`
/// when it is a plain string.
fn text_field(json: &Value) -> String {
    str_field(json, "text")
        .or_else(|| str_field(json, "content"))
        .unwrap_or_default()
        .to_string()
}

/// Parse one stdout line into a typed event. Returns `None` for blank
/// lines, non-JSON noise, and unknown type tags.
pub fn parse_agent_line(line: &str) -> Option<AgentEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let json: Value = serde_json::from_str(trimmed).ok()?;
    let event_type = str_field(&json, "type")?;

    match event_type {
        "init" | "system" => Some(AgentEvent::Init {
            session_id: str_field(&json, "session_id").unwrap_or_default().to_string(),
        }),
        "user" | "human" => Some(AgentEvent::UserMessage {
            text: text_field(&json),
        }),
        "assistant" | "text" => Some(AgentEvent::AssistantText {
            text: text_field(&json),
        }),
        "tool_use" | "tool_use_begin" => Some(AgentEvent::ToolUse {
            tool_use_id: str_field(&json, "tool_use_id").unwrap_or_default().to_string(),
            tool_name: str_field(&json, "tool_name").unwrap_or_default().to_string(),
            tool_input: json.get("tool_input").cloned().unwrap_or(Value::Null),
        }),
        "tool_result" | "tool_use_end" => Some(AgentEvent::ToolResult {
            tool_use_id: str_field(&json, "tool_use_id").unwrap_or_default().to_string(),
            tool_result: json.get("tool_result").cloned().unwrap_or(Value::Null),
        }),
        "result" | "end" => Some(AgentEvent::Result {
            success: json.get("success").and_then(Value::as_bool).unwrap_or(false),
            total_cost: str_field(&json, "total_cost").unwrap_or_default().to_string(),
            total_tokens: json
                .get("total_tokens")
                .and_then(Value::as_u64)
                .unwrap_or_default(),
        }),
        "error" => Some(AgentEvent::Error {
            message: str_field(&json, "message")
                .or_else(|| str_field(&json, "error"))
                .unwrap_or_default()
                .to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
