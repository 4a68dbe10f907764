// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive chat: a singleton session with a dedicated advisor agent.
//!
//! `send` relays a line and waits for the next assistant reply with a
//! wall-clock timeout; everything exchanged lands in the in-memory
//! history (and the ledger, via the ops layer).

use crate::ctx::EngineCtx;
use crate::error::EngineError;
use crate::prompt;
use chrono::{DateTime, Utc};
use cosa_adapters::{AgentControl, LaunchSpec};
use cosa_core::{AgentEvent, WorkerRole};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub text: String,
    pub ts: DateTime<Utc>,
}

pub struct ChatSession {
    control: AgentControl,
    events: tokio::sync::Mutex<mpsc::Receiver<AgentEvent>>,
    history: Mutex<Vec<ChatMessage>>,
    pub started_at: DateTime<Utc>,
}

impl ChatSession {
    /// Launch the chat agent. The caller installs the session as the
    /// context singleton; starting twice without ending is rejected there.
    pub async fn start(ctx: &Arc<EngineCtx>) -> Result<Arc<Self>, EngineError> {
        let spec = LaunchSpec {
            binary: ctx.config.claude.binary.clone(),
            prompt: format!(
                "{}\n\nYou are in an interactive conversation with the \
                 operator. Answer each message as it arrives.",
                prompt::role_preamble(WorkerRole::Consigliere)
            ),
            cwd: ctx.active_territory().map(|t| t.repo_root),
            model: ctx.config.model_for(WorkerRole::Consigliere).map(str::to_string),
            max_turns: None,
            resume_session: None,
        };
        let handle = ctx.launcher.launch(spec).await?;
        Ok(Arc::new(Self {
            control: handle.control,
            events: tokio::sync::Mutex::new(handle.events),
            history: Mutex::new(Vec::new()),
            started_at: ctx.now(),
        }))
    }

    /// Send one message and wait for the assistant's reply.
    pub async fn send(
        &self,
        text: &str,
        timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, EngineError> {
        self.history.lock().push(ChatMessage {
            role: "user".to_string(),
            text: text.to_string(),
            ts: now,
        });
        self.control.send_input(text).await?;

        let mut events = self.events.lock().await;
        let reply = tokio::time::timeout(timeout, async {
            while let Some(event) = events.recv().await {
                if let AgentEvent::AssistantText { text } = event {
                    return Some(text);
                }
            }
            None
        })
        .await
        .map_err(|_| EngineError::InvalidState("chat response timed out".to_string()))?
        .ok_or_else(|| EngineError::InvalidState("chat session ended".to_string()))?;

        self.history.lock().push(ChatMessage {
            role: "assistant".to_string(),
            text: reply.clone(),
            ts: now,
        });
        Ok(reply)
    }

    pub fn end(&self) {
        self.control.stop();
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().clone()
    }
}
