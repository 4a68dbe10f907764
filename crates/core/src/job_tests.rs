// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::FakeClock;
use yare::parameterized;

fn spec(id: &str) -> JobSpec {
    JobSpec {
        id: id.to_string(),
        description: "wire up the widget".to_string(),
        priority: 3,
        ..JobSpec::default()
    }
}

#[test]
fn new_job_is_pending() {
    let clock = FakeClock::new();
    let job = Job::new(spec("job-1"), &clock);

    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.priority, 3);
    assert!(job.assigned_worker.is_none());
    assert!(job.worktree_path.is_none());
    assert!(job.error.is_none());
    assert_eq!(job.cost, Cost::ZERO);
    assert_eq!(job.created_at, clock.now());
}

#[parameterized(
    pending_to_queued = { JobStatus::Pending, JobStatus::Queued, true },
    pending_to_cancelled = { JobStatus::Pending, JobStatus::Cancelled, true },
    pending_to_failed = { JobStatus::Pending, JobStatus::Failed, true },
    pending_to_running = { JobStatus::Pending, JobStatus::Running, false },
    queued_to_running = { JobStatus::Queued, JobStatus::Running, true },
    queued_to_failed = { JobStatus::Queued, JobStatus::Failed, true },
    queued_to_completed = { JobStatus::Queued, JobStatus::Completed, false },
    running_to_review = { JobStatus::Running, JobStatus::Review, true },
    running_to_failed = { JobStatus::Running, JobStatus::Failed, true },
    running_to_cancelled = { JobStatus::Running, JobStatus::Cancelled, true },
    running_to_completed = { JobStatus::Running, JobStatus::Completed, false },
    review_to_completed = { JobStatus::Review, JobStatus::Completed, true },
    review_to_failed = { JobStatus::Review, JobStatus::Failed, true },
    review_to_cancelled = { JobStatus::Review, JobStatus::Cancelled, false },
    completed_to_failed = { JobStatus::Completed, JobStatus::Failed, false },
    failed_to_running = { JobStatus::Failed, JobStatus::Running, false },
    cancelled_to_queued = { JobStatus::Cancelled, JobStatus::Queued, false },
)]
fn transition_dag(from: JobStatus, to: JobStatus, legal: bool) {
    assert_eq!(from.can_transition(to), legal, "{from} -> {to}");
}

#[test]
fn full_happy_path() {
    let clock = FakeClock::new();
    let mut job = Job::new(spec("job-1"), &clock);

    job.queue(WorkerId::new("w-1"), clock.now()).unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.assigned_worker, Some(WorkerId::new("w-1")));
    assert!(job.queued_at.is_some());

    clock.advance_secs(1);
    job.start(clock.now()).unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert!(job.started_at.is_some());

    job.enter_review().unwrap();
    clock.advance_secs(5);
    job.complete(clock.now()).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.is_terminal());
    assert_eq!(job.completed_at, Some(clock.now()));
}

#[test]
fn fail_records_reason() {
    let clock = FakeClock::new();
    let mut job = Job::new(spec("job-1"), &clock);

    job.fail("dependency failed: job-0", clock.now()).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("dependency failed: job-0"));
}

#[test]
fn terminal_jobs_reject_further_transitions() {
    let clock = FakeClock::new();
    let mut job = Job::new(spec("job-1"), &clock);
    job.cancel(clock.now()).unwrap();

    assert!(job.queue(WorkerId::new("w"), clock.now()).is_err());
    assert!(job.start(clock.now()).is_err());
    assert!(job.fail("late", clock.now()).is_err());
}

#[test]
fn reset_clears_execution_fields() {
    let clock = FakeClock::new();
    let mut job = Job::new(spec("job-1"), &clock);
    job.queue(WorkerId::new("w-1"), clock.now()).unwrap();
    job.start(clock.now()).unwrap();
    job.set_worktree(PathBuf::from("/wt/job-1"), "cosa/job/job-1".into());
    job.session_id = Some(SessionId::new("s-1"));
    job.absorb_usage(Cost::parse("1.50").unwrap(), 400);
    job.fail("agent crashed", clock.now()).unwrap();

    job.reset().unwrap();

    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.assigned_worker.is_none());
    assert!(job.session_id.is_none());
    assert!(job.worktree_path.is_none());
    assert!(job.branch.is_none());
    assert!(job.error.is_none());
    assert!(job.queued_at.is_none());
    assert!(job.started_at.is_none());
    assert!(job.completed_at.is_none());
    assert_eq!(job.cost, Cost::ZERO);
    assert_eq!(job.total_tokens, 0);
}

#[parameterized(
    pending = { JobStatus::Pending },
    queued = { JobStatus::Queued },
    running = { JobStatus::Running },
    review = { JobStatus::Review },
    completed = { JobStatus::Completed },
)]
fn reset_is_illegal_outside_failed_and_cancelled(status: JobStatus) {
    let clock = FakeClock::new();
    let mut job = Job::new(spec("job-1"), &clock);
    job.status = status;
    assert!(job.reset().is_err());
}

#[test]
fn reset_is_legal_from_cancelled() {
    let clock = FakeClock::new();
    let mut job = Job::new(spec("job-1"), &clock);
    job.cancel(clock.now()).unwrap();
    job.reset().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
}

#[test]
fn serde_round_trip() {
    let clock = FakeClock::new();
    let mut job = Job::new(
        JobSpec {
            id: "job-9".to_string(),
            description: "refactor the parser".to_string(),
            priority: 7,
            depends_on: vec!["job-1".to_string(), "job-2".to_string()],
            operation_id: Some("op-1".to_string()),
            revision_of: Some("job-8".to_string()),
            review_feedback: vec!["tighten error handling".to_string()],
        },
        &clock,
    );
    job.queue(WorkerId::new("w-1"), clock.now()).unwrap();
    job.set_worktree(PathBuf::from("/wt"), "cosa/job/job-9".into());
    job.absorb_usage(Cost::parse("$0.42").unwrap(), 1234);

    let json = serde_json::to_string(&job).unwrap();
    let back: Job = serde_json::from_str(&json).unwrap();
    assert_eq!(back, job);
}

#[test]
fn status_serde_is_snake_case() {
    assert_eq!(
        serde_json::to_string(&JobStatus::Review).unwrap(),
        "\"review\""
    );
    let s: JobStatus = serde_json::from_str("\"cancelled\"").unwrap();
    assert_eq!(s, JobStatus::Cancelled);
}
