// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests: an [`EngineCtx`] wired to fakes on
//! a temp data dir, plus polling helpers for async assertions.

use crate::ctx::{EngineCtx, EngineDeps};
use crate::pool::WorkerPool;
use cosa_adapters::{FakeAgentLauncher, FakeNotifier, FakeReviewer, FakeVcs};
use cosa_core::{Config, FakeClock, IdGen, SequentialIdGen};
use cosa_storage::{
    DataDir, JobStore, Ledger, OperationStore, SessionStore, TerritoryStore, WorkerFiles,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Distinct id prefixes per harness, so a rebuilt harness over the same
/// data dir never re-mints ids that already exist on disk.
static HARNESS_SEQ: AtomicU64 = AtomicU64::new(0);

pub struct TestHarness {
    pub ctx: Arc<EngineCtx>,
    pub launcher: Arc<FakeAgentLauncher>,
    pub vcs: Arc<FakeVcs>,
    pub reviewer: Arc<FakeReviewer>,
    pub notifier: Arc<FakeNotifier>,
    pub clock: Arc<FakeClock>,
    root: PathBuf,
    _tmp: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Tear the context down and rebuild it from the same data dir, as a
    /// daemon restart would.
    pub fn restart(self) -> TestHarness {
        let TestHarness { root, _tmp, .. } = self;
        build(root, _tmp, Config::default(), false)
    }
}

/// Default harness: fakes everywhere, a registered territory, default
/// config.
pub fn harness() -> TestHarness {
    harness_with(|_| {})
}

pub fn harness_with(tweak: impl FnOnce(&mut Config)) -> TestHarness {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().to_owned();
    let mut config = Config::default();
    tweak(&mut config);
    build(root, Some(tmp), config, true)
}

fn build(
    root: PathBuf,
    tmp: Option<tempfile::TempDir>,
    config: Config,
    init_territory: bool,
) -> TestHarness {
    let data = DataDir::new(&root);
    data.ensure().unwrap();

    let clock = Arc::new(FakeClock::new());
    let ledger = Arc::new(Ledger::open(&data.ledger_path(), clock.clone()).unwrap());
    let jobs = Arc::new(JobStore::open(&data.jobs_dir()).unwrap());
    let operations = Arc::new(OperationStore::open(&data.operations_dir()).unwrap());
    let sessions = Arc::new(SessionStore::open(&data.sessions_dir()).unwrap());
    let territories = Arc::new(TerritoryStore::open(&data.territories_path()).unwrap());
    let pool = WorkerPool::open(WorkerFiles::open(&data.workers_dir()).unwrap()).unwrap();

    let launcher = Arc::new(FakeAgentLauncher::new());
    let vcs = Arc::new(FakeVcs::new());
    let reviewer = Arc::new(FakeReviewer::new());
    let notifier = Arc::new(FakeNotifier::new());
    let idgen = SequentialIdGen::new(format!(
        "id{}",
        HARNESS_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

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
        reviewer: reviewer.clone(),
        notifier: notifier.clone(),
        idgen: Box::new(move || idgen.next()),
    });

    if init_territory {
        crate::ops::territory_init(&ctx, "testland", root.join("repo"), None).unwrap();
    }

    TestHarness {
        ctx,
        launcher,
        vcs,
        reviewer,
        notifier,
        clock,
        root,
        _tmp: tmp,
    }
}

/// Poll until `check` passes or two seconds elapse.
pub async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..400 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 2s");
}

/// Count of events of a type currently in the ledger.
pub fn event_count(harness: &TestHarness, event_type: &str) -> usize {
    harness
        .ctx
        .ledger
        .read_all()
        .unwrap()
        .iter()
        .filter(|e| e.event_type == event_type)
        .count()
}
