// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed events produced by an agent child process.
//!
//! The raw wire format is one JSON object per stdout line; the adapter
//! scans those into this enum. See `cosa-adapters` for the scanner.

use serde::{Deserialize, Serialize};

/// One event from an agent's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Session bootstrap. The first init carrying a non-empty session id
    /// latches the adapter's session for later resumption.
    Init { session_id: String },
    UserMessage { text: String },
    AssistantText { text: String },
    ToolUse {
        tool_use_id: String,
        tool_name: String,
        tool_input: serde_json::Value,
    },
    /// Pairs with the most recent `ToolUse`.
    ToolResult {
        tool_use_id: String,
        tool_result: serde_json::Value,
    },
    /// Terminal outcome of the run. `total_cost` is a dollar string.
    Result {
        success: bool,
        total_cost: String,
        total_tokens: u64,
    },
    Error { message: String },
}

impl AgentEvent {
    /// Stable tag for ledger payloads and logging.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::Init { .. } => "init",
            AgentEvent::UserMessage { .. } => "user_message",
            AgentEvent::AssistantText { .. } => "assistant_text",
            AgentEvent::ToolUse { .. } => "tool_use",
            AgentEvent::ToolResult { .. } => "tool_result",
            AgentEvent::Result { .. } => "result",
            AgentEvent::Error { .. } => "error",
        }
    }
}
