// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cosa_core::{Clock, Cost, FakeClock, WorkerInfo, WorkerRole, WorkerStatus};
use cosa_storage::WorkerFiles;

fn make_worker(tmp: &tempfile::TempDir) -> Arc<Worker> {
    let clock = FakeClock::new();
    let files = Arc::new(WorkerFiles::open(tmp.path()).unwrap());
    Worker::new(
        WorkerInfo::new(WorkerId::new("wid-1"), "paulie", WorkerRole::Soldier, clock.now()),
        files,
    )
}

#[test]
fn begin_and_finish_maintain_the_binding_invariant() {
    let tmp = tempfile::tempdir().unwrap();
    let worker = make_worker(&tmp);

    // idle: no job bound
    assert_eq!(worker.status(), WorkerStatus::Idle);
    assert!(worker.current_job().is_none());

    worker.begin_job(&JobId::new("job-1")).unwrap();
    assert_eq!(worker.status(), WorkerStatus::Working);
    assert_eq!(worker.current_job(), Some(JobId::new("job-1")));

    // busy workers refuse a second job
    assert!(worker.begin_job(&JobId::new("job-2")).is_err());

    worker.begin_review(&JobId::new("job-1"));
    assert_eq!(worker.status(), WorkerStatus::Reviewing);
    assert!(worker.current_job().is_some());

    worker.finish_job();
    assert_eq!(worker.status(), WorkerStatus::Idle);
    assert!(worker.current_job().is_none());
}

#[test]
fn mark_error_clears_the_bound_job() {
    let tmp = tempfile::tempdir().unwrap();
    let worker = make_worker(&tmp);
    worker.begin_job(&JobId::new("job-1")).unwrap();

    worker.mark_error();
    assert_eq!(worker.status(), WorkerStatus::Error);
    assert!(worker.current_job().is_none());

    // The lifecycle epilogue still releases it back to idle.
    worker.finish_job();
    assert_eq!(worker.status(), WorkerStatus::Idle);
}

#[test]
fn stop_is_terminal_for_scheduling() {
    let tmp = tempfile::tempdir().unwrap();
    let worker = make_worker(&tmp);
    worker.begin_job(&JobId::new("job-1")).unwrap();

    worker.stop();
    assert_eq!(worker.status(), WorkerStatus::Stopped);
    assert!(worker.current_job().is_none());
    assert!(worker.begin_job(&JobId::new("job-2")).is_err());
}

#[tokio::test]
async fn send_message_requires_working_status() {
    let tmp = tempfile::tempdir().unwrap();
    let worker = make_worker(&tmp);

    let err = worker.send_message("hello").await;
    assert!(matches!(err, Err(EngineError::InvalidState(_))));
}

#[test]
fn durable_mutations_write_through() {
    let tmp = tempfile::tempdir().unwrap();
    let worker = make_worker(&tmp);

    worker.set_session(SessionId::new("s-abc")).unwrap();
    worker.absorb_usage(Cost::parse("$0.50").unwrap(), 100).unwrap();
    worker.record_success().unwrap();
    worker
        .set_standing_orders(vec!["always run the tests".to_string()])
        .unwrap();

    let files = WorkerFiles::open(tmp.path()).unwrap();
    let loaded = files.load("paulie").unwrap();
    assert_eq!(loaded.session_id, Some(SessionId::new("s-abc")));
    assert_eq!(loaded.jobs_completed, 1);
    assert_eq!(loaded.total_cost, Cost::parse("0.5").unwrap());
    assert_eq!(loaded.total_tokens, 100);
    assert_eq!(loaded.standing_orders, ["always run the tests"]);
}

#[test]
fn info_returns_a_defensive_copy() {
    let tmp = tempfile::tempdir().unwrap();
    let worker = make_worker(&tmp);

    let mut copy = worker.info();
    copy.jobs_completed = 99;
    assert_eq!(worker.jobs_completed(), 0);
}
