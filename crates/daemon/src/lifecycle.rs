// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.
//!
//! Startup order: resolve the data dir, take the pid lock (one daemon
//! per data dir), open the stores, build the engine context, load
//! pending worker records back to life, bind the socket, start the
//! background loops. Shutdown unwinds the same steps in reverse.

use crate::handlers::HandlerDeps;
use crate::listener::Subscriptions;
use cosa_adapters::{DesktopNotifier, GitVcs, ProcessAgentLauncher, ProcessReviewer};
use cosa_core::event::types as event_types;
use cosa_core::{Clock, Config, IdGen, SystemClock, UuidIdGen, WorkerRole};
use cosa_engine::ctx::{EngineCtx, EngineDeps};
use cosa_engine::{health::HealthMonitor, ops, WorkerPool};
use cosa_storage::{
    DataDir, JobStore, Ledger, LedgerError, OperationStore, SessionStore, StoreError,
    TerritoryStore, WorkerFiles,
};
use fs2::FileExt;
use serde_json::json;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("another daemon already owns this data dir: {0}")]
    LockFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("config error: {0}")]
    Config(String),
}

/// A started daemon: the engine context plus everything the listener
/// and the shutdown path need.
pub struct Daemon {
    pub ctx: Arc<EngineCtx>,
    pub deps: Arc<HandlerDeps>,
    pub data: DataDir,
    /// Held for the daemon's lifetime; releasing it frees the data dir.
    _lock_file: File,
}

/// Resolve the data directory: config first, then the conventional
/// per-user state location.
pub fn resolve_data_dir(config: &Config) -> PathBuf {
    if let Some(dir) = &config.data_dir {
        return dir.clone();
    }
    dirs::state_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cosa")
}

/// Load the config file if one exists: `$COSA_CONFIG`, else
/// `~/.config/cosa/config.toml`, else defaults.
pub fn load_config() -> Result<Config, LifecycleError> {
    let path = std::env::var_os("COSA_CONFIG")
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|d| d.join("cosa/config.toml")));
    let Some(path) = path else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    toml::from_str(&raw).map_err(|e| LifecycleError::Config(format!("{}: {e}", path.display())))
}

/// Bring the daemon up. Returns the daemon and the bound socket.
pub async fn startup(config: Config) -> Result<(Daemon, UnixListener), LifecycleError> {
    let data = DataDir::new(resolve_data_dir(&config));
    data.ensure()?;

    // One daemon per data dir, enforced by an advisory lock on the pid
    // file. The lock dies with the process, so a crashed daemon never
    // wedges the dir.
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(data.pid_path())?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| LifecycleError::LockFailed(data.pid_path().display().to_string()))?;
    lock_file.set_len(0)?;
    writeln!(&lock_file, "{}", std::process::id())?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ledger = Arc::new(Ledger::open(&data.ledger_path(), Arc::clone(&clock))?);
    let jobs = Arc::new(JobStore::open(&data.jobs_dir())?);
    let operations = Arc::new(OperationStore::open(&data.operations_dir())?);
    let sessions = Arc::new(SessionStore::open(&data.sessions_dir())?);
    let territories = Arc::new(TerritoryStore::open(&data.territories_path())?);
    let pool = WorkerPool::open(WorkerFiles::open(&data.workers_dir())?)?;

    let reviewer = ProcessReviewer::new(
        config.claude.binary.clone(),
        config.model_for(WorkerRole::Consigliere).map(str::to_string),
    );
    let idgen = UuidIdGen;

    let ctx = EngineCtx::new(EngineDeps {
        config,
        data: data.clone(),
        clock,
        ledger,
        jobs,
        operations,
        sessions,
        territories,
        pool,
        vcs: Arc::new(GitVcs),
        launcher: Arc::new(ProcessAgentLauncher),
        reviewer: Arc::new(reviewer),
        notifier: Arc::new(DesktopNotifier),
        idgen: Box::new(move || idgen.next()),
    });

    // Reconstitute persisted workers: pending records become live pool
    // members with their identity, counters, and session intact.
    for info in ctx.pool.pending() {
        match ops::add_worker(&ctx, &info.name, None) {
            Ok(worker) => info!(worker = %worker.name(), "worker reconstituted"),
            Err(e) => error!(worker = %info.name, error = %e, "worker reconstitution failed"),
        }
    }

    // A stale socket from a dead daemon would block the bind; the pid
    // lock above proves nobody is listening on it.
    let socket_path = data.socket_path();
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }
    let socket = UnixListener::bind(&socket_path)?;

    ctx.append_event(
        event_types::DAEMON_STARTED,
        json!({"pid": std::process::id(), "workers": ctx.pool.len()}),
    );

    // Background loops.
    ctx.tracker.spawn(cosa_engine::scheduler::run(Arc::clone(&ctx)));
    ctx.tracker
        .spawn(Arc::new(HealthMonitor::new()).run(Arc::clone(&ctx)));
    ctx.tracker.spawn(cosa_engine::cleaner::run(Arc::clone(&ctx)));

    let deps = Arc::new(HandlerDeps {
        engine: Arc::clone(&ctx),
        subs: Arc::new(Subscriptions::default()),
        shutdown: Arc::new(Notify::new()),
        start_time: Instant::now(),
    });

    Ok((
        Daemon {
            ctx,
            deps,
            data,
            _lock_file: lock_file,
        },
        socket,
    ))
}

/// Shutdown sequence: stop intake and loops, persist
/// sessions, stop workers, close subscribers, close the ledger, remove
/// the socket and pid files.
pub async fn shutdown(daemon: Daemon) {
    let Daemon {
        ctx, deps, data, ..
    } = daemon;

    ctx.append_event(event_types::DAEMON_SHUTDOWN, json!({}));

    // Stops the accept loop, the scheduler, health monitor, cleaner,
    // connection tasks, and running job loops.
    ctx.cancel.cancel();

    // Freshen the sessions of currently-running workers so their age
    // reflects this shutdown, then stop every worker.
    let now = ctx.now();
    for worker in ctx.pool.list() {
        if worker.is_busy() {
            if let Some(session) = worker.session_id() {
                if let Err(e) = ctx.sessions.touch(session.as_str(), now) {
                    warn!(worker = %worker.name(), error = %e, "session persist failed");
                }
            }
        }
        worker.stop();
    }

    if let Some(chat) = ctx.take_chat() {
        chat.end();
    }

    deps.subs.close_all();

    ctx.tracker.close();
    ctx.tracker.wait().await;

    ctx.ledger.close();

    let _ = std::fs::remove_file(data.socket_path());
    let _ = std::fs::remove_file(data.pid_path());
    info!("daemon stopped");
}
