// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory agent launcher for tests.
//!
//! Each launch pops the next script of events, replays it on the event
//! channel, then closes the channel (the completion signal). Inputs sent
//! through the control handle are recorded; optional replies let chat
//! tests model request/response turns.

use super::{AgentControl, AgentError, AgentHandle, AgentLauncher, LaunchSpec};
use cosa_core::AgentEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
struct FakeState {
    scripts: VecDeque<Vec<AgentEvent>>,
    replies: VecDeque<AgentEvent>,
    launches: Vec<LaunchSpec>,
    inputs: Vec<String>,
    stops: usize,
    /// When set, a launch with no script hangs until stopped instead of
    /// closing immediately — for stuck-worker tests.
    hang_without_script: bool,
}

/// Scriptable [`AgentLauncher`].
#[derive(Clone, Default)]
pub struct FakeAgentLauncher {
    state: Arc<Mutex<FakeState>>,
}

impl FakeAgentLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the events the next launch will replay.
    pub fn push_script(&self, events: Vec<AgentEvent>) {
        self.state.lock().scripts.push_back(events);
    }

    /// Convenience script: an init with the given session followed by a
    /// successful result.
    pub fn push_success(&self, session_id: &str, total_cost: &str, total_tokens: u64) {
        self.push_script(vec![
            AgentEvent::Init {
                session_id: session_id.to_string(),
            },
            AgentEvent::Result {
                success: true,
                total_cost: total_cost.to_string(),
                total_tokens,
            },
        ]);
    }

    /// Queue a reply event, emitted after the next input arrives.
    pub fn push_reply(&self, event: AgentEvent) {
        self.state.lock().replies.push_back(event);
    }

    /// Make script-less launches hang until stopped.
    pub fn hang_without_script(&self) {
        self.state.lock().hang_without_script = true;
    }

    /// Every launch spec seen, in order.
    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.state.lock().launches.clone()
    }

    /// Every input line relayed to any launched agent.
    pub fn inputs(&self) -> Vec<String> {
        self.state.lock().inputs.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().stops
    }
}

#[async_trait::async_trait]
impl AgentLauncher for FakeAgentLauncher {
    async fn launch(&self, spec: LaunchSpec) -> Result<AgentHandle, AgentError> {
        let (script, hang) = {
            let mut state = self.state.lock();
            state.launches.push(spec);
            (
                state.scripts.pop_front(),
                state.hang_without_script,
            )
        };

        let (event_tx, event_rx) = mpsc::channel(64);
        let (ctl_tx, mut ctl_rx) = mpsc::channel(16);
        let session = Arc::new(Mutex::new(None));

        let state = Arc::clone(&self.state);
        let latch = Arc::clone(&session);
        tokio::spawn(async move {
            if let Some(events) = script {
                for event in events {
                    if let AgentEvent::Init { session_id } = &event {
                        if !session_id.is_empty() {
                            let mut guard = latch.lock();
                            if guard.is_none() {
                                *guard = Some(session_id.clone());
                            }
                        }
                    }
                    if event_tx.send(event).await.is_err() {
                        return;
                    }
                }
                if !hang {
                    return; // drops event_tx: completion
                }
            } else if !hang {
                return;
            }

            // Interactive tail: record inputs, emit queued replies, close
            // on stop or when the control handle goes away.
            while let Some(cmd) = ctl_rx.recv().await {
                match cmd {
                    super::Control::Input(text) => {
                        let reply = {
                            let mut guard = state.lock();
                            guard.inputs.push(text);
                            guard.replies.pop_front()
                        };
                        if let Some(event) = reply {
                            if event_tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    super::Control::Stop => {
                        state.lock().stops += 1;
                        return;
                    }
                }
            }
        });

        Ok(AgentHandle {
            events: event_rx,
            control: AgentControl {
                tx: ctl_tx,
                session,
            },
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
