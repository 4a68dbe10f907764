// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon context: every component reachable from one struct.
//!
//! Shared mutable singletons (active territory, chat session) sit behind
//! the context's own mutex, held only for pointer swaps. Long-lived
//! tasks are spawned on the tracker and watch the cancellation token.

use crate::chat::ChatSession;
use crate::pool::WorkerPool;
use crate::queue::JobQueue;
use crate::review::ReviewRegistry;
use chrono::{DateTime, Utc};
use cosa_adapters::{AgentLauncher, Notifier, Reviewer, Vcs};
use cosa_core::{Clock, Config, Territory};
use cosa_storage::{
    DataDir, JobStore, Ledger, OperationStore, SessionStore, TerritoryStore,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::error;

/// Everything the engine needs, constructed once at startup.
pub struct EngineCtx {
    pub config: Config,
    pub data: DataDir,
    pub clock: Arc<dyn Clock>,
    pub ledger: Arc<Ledger>,
    pub jobs: Arc<JobStore>,
    pub operations: Arc<OperationStore>,
    pub sessions: Arc<SessionStore>,
    pub territories: Arc<TerritoryStore>,
    pub queue: JobQueue,
    pub pool: WorkerPool,
    pub vcs: Arc<dyn Vcs>,
    pub launcher: Arc<dyn AgentLauncher>,
    pub reviewer: Arc<dyn Reviewer>,
    pub notifier: Arc<dyn Notifier>,
    pub reviews: ReviewRegistry,
    /// Serializes checkout + merge sequences against the shared
    /// repository HEAD: concurrent jobs finish in any order, but only
    /// one merges at a time.
    pub merge_lock: tokio::sync::Mutex<()>,
    pub cancel: CancellationToken,
    pub tracker: TaskTracker,
    idgen: Box<dyn Fn() -> String + Send + Sync>,
    state: Mutex<CtxState>,
}

#[derive(Default)]
struct CtxState {
    territory: Option<Territory>,
    chat: Option<Arc<ChatSession>>,
}

/// Constructor inputs, to keep `EngineCtx::new` readable.
pub struct EngineDeps {
    pub config: Config,
    pub data: DataDir,
    pub clock: Arc<dyn Clock>,
    pub ledger: Arc<Ledger>,
    pub jobs: Arc<JobStore>,
    pub operations: Arc<OperationStore>,
    pub sessions: Arc<SessionStore>,
    pub territories: Arc<TerritoryStore>,
    pub pool: WorkerPool,
    pub vcs: Arc<dyn Vcs>,
    pub launcher: Arc<dyn AgentLauncher>,
    pub reviewer: Arc<dyn Reviewer>,
    pub notifier: Arc<dyn Notifier>,
    pub idgen: Box<dyn Fn() -> String + Send + Sync>,
}

impl EngineCtx {
    pub fn new(deps: EngineDeps) -> Arc<Self> {
        let queue = JobQueue::new(Arc::clone(&deps.jobs), Arc::clone(&deps.clock));
        // The most recently registered territory is active on startup.
        let territory = deps.territories.list().into_iter().last();
        Arc::new(Self {
            config: deps.config,
            data: deps.data,
            clock: deps.clock,
            ledger: deps.ledger,
            jobs: deps.jobs,
            operations: deps.operations,
            sessions: deps.sessions,
            territories: deps.territories,
            queue,
            pool: deps.pool,
            vcs: deps.vcs,
            launcher: deps.launcher,
            reviewer: deps.reviewer,
            notifier: deps.notifier,
            reviews: ReviewRegistry::default(),
            merge_lock: tokio::sync::Mutex::new(()),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            idgen: deps.idgen,
            state: Mutex::new(CtxState {
                territory,
                chat: None,
            }),
        })
    }

    pub fn new_id(&self) -> String {
        (self.idgen)()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn active_territory(&self) -> Option<Territory> {
        self.state.lock().territory.clone()
    }

    pub fn set_active_territory(&self, territory: Territory) {
        self.state.lock().territory = Some(territory);
    }

    /// Repo root and merge target of the active territory.
    pub fn merge_context(&self) -> Option<(PathBuf, String)> {
        let territory = self.active_territory()?;
        let target = territory
            .merge_target(&self.config.git.default_merge_branch)
            .to_string();
        Some((territory.repo_root, target))
    }

    pub fn chat(&self) -> Option<Arc<ChatSession>> {
        self.state.lock().chat.clone()
    }

    pub fn set_chat(&self, chat: Arc<ChatSession>) {
        self.state.lock().chat = Some(chat);
    }

    pub fn take_chat(&self) -> Option<Arc<ChatSession>> {
        self.state.lock().chat.take()
    }

    /// Ledger append that never propagates: background loops log the
    /// failure and keep going.
    pub fn append_event(&self, event_type: &str, payload: serde_json::Value) {
        if let Err(e) = self.ledger.append(event_type, payload) {
            error!(event_type, error = %e, "ledger append failed");
        }
    }
}
