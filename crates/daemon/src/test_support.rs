// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test fixtures: an engine context on fakes plus handler deps.

use crate::handlers::HandlerDeps;
use crate::listener::Subscriptions;
use cosa_adapters::{FakeAgentLauncher, FakeNotifier, FakeReviewer, FakeVcs};
use cosa_core::{Config, FakeClock, IdGen, SequentialIdGen};
use cosa_engine::ctx::{EngineCtx, EngineDeps};
use cosa_engine::{ops, WorkerPool};
use cosa_storage::{
    DataDir, JobStore, Ledger, OperationStore, SessionStore, TerritoryStore, WorkerFiles,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;

pub struct Fixture {
    pub deps: Arc<HandlerDeps>,
    pub launcher: Arc<FakeAgentLauncher>,
    pub vcs: Arc<FakeVcs>,
    pub clock: Arc<FakeClock>,
    pub _tmp: tempfile::TempDir,
}

pub fn fixture() -> Fixture {
    fixture_with(|_| {})
}

pub fn fixture_with(tweak: impl FnOnce(&mut Config)) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let data = DataDir::new(tmp.path());
    data.ensure().unwrap();

    let mut config = Config::default();
    tweak(&mut config);

    let clock = Arc::new(FakeClock::new());
    let ledger = Arc::new(Ledger::open(&data.ledger_path(), clock.clone()).unwrap());
    let jobs = Arc::new(JobStore::open(&data.jobs_dir()).unwrap());
    let operations = Arc::new(OperationStore::open(&data.operations_dir()).unwrap());
    let sessions = Arc::new(SessionStore::open(&data.sessions_dir()).unwrap());
    let territories = Arc::new(TerritoryStore::open(&data.territories_path()).unwrap());
    let pool = WorkerPool::open(WorkerFiles::open(&data.workers_dir()).unwrap()).unwrap();

    let launcher = Arc::new(FakeAgentLauncher::new());
    let vcs = Arc::new(FakeVcs::new());
    let idgen = SequentialIdGen::new("id");

    let ctx = EngineCtx::new(EngineDeps {
        config,
        data,
        clock: clock.clone(),
        ledger,
        jobs,
        operations,
        sessions,
        territories,
        pool,
        vcs: vcs.clone(),
        launcher: launcher.clone(),
        reviewer: Arc::new(FakeReviewer::new()),
        notifier: Arc::new(FakeNotifier::new()),
        idgen: Box::new(move || idgen.next()),
    });
    ops::territory_init(&ctx, "testland", tmp.path().join("repo"), None).unwrap();

    let deps = Arc::new(HandlerDeps {
        engine: ctx,
        subs: Arc::new(Subscriptions::default()),
        shutdown: Arc::new(Notify::new()),
        start_time: Instant::now(),
    });

    Fixture {
        deps,
        launcher,
        vcs,
        clock,
        _tmp: tmp,
    }
}
