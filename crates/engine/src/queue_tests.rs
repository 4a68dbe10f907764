// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cosa_core::{FakeClock, Job, JobSpec, WorkerId};
use proptest::prelude::*;
use std::sync::Arc;

struct Fixture {
    store: Arc<JobStore>,
    clock: Arc<FakeClock>,
    queue: JobQueue,
    _tmp: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(JobStore::open(tmp.path()).unwrap());
    let clock = Arc::new(FakeClock::new());
    let queue = JobQueue::new(Arc::clone(&store), clock.clone());
    Fixture {
        store,
        clock,
        queue,
        _tmp: tmp,
    }
}

impl Fixture {
    fn add_job(&self, id: &str, priority: i32, deps: &[&str]) -> Job {
        let job = Job::new(
            JobSpec {
                id: id.to_string(),
                description: format!("task {id}"),
                priority,
                depends_on: deps.iter().map(|d| d.to_string()).collect(),
                ..JobSpec::default()
            },
            self.clock.as_ref(),
        );
        self.store.insert(job.clone()).unwrap();
        job
    }

    fn complete(&self, id: &str) {
        let now = self.clock.now();
        self.store
            .update(id, |j| {
                j.queue(WorkerId::new("w"), now)?;
                j.start(now)?;
                j.enter_review()?;
                j.complete(now)
            })
            .unwrap();
        self.queue.notify_completion(id);
    }

    fn fail(&self, id: &str) {
        let now = self.clock.now();
        self.store.update(id, |j| j.fail("boom", now)).unwrap();
        self.queue.notify_failure(id);
    }
}

#[test]
fn dequeues_by_priority_then_age() {
    let f = fixture();
    let low_old = f.add_job("low-old", 3, &[]);
    f.clock.advance_secs(10);
    let high = f.add_job("high", 5, &[]);
    f.clock.advance_secs(10);
    let low_new = f.add_job("low-new", 3, &[]);

    f.queue.enqueue(&low_new);
    f.queue.enqueue(&low_old);
    f.queue.enqueue(&high);

    assert_eq!(f.queue.dequeue().unwrap().id, high.id);
    assert_eq!(f.queue.dequeue().unwrap().id, low_old.id);
    assert_eq!(f.queue.dequeue().unwrap().id, low_new.id);
    assert!(f.queue.dequeue().is_none());
}

#[test]
fn higher_priority_beats_older_job() {
    // S4: priority 3 created earlier vs priority 5 created later.
    let f = fixture();
    let older = f.add_job("older", 3, &[]);
    f.clock.advance_secs(60);
    let urgent = f.add_job("urgent", 5, &[]);

    f.queue.enqueue(&older);
    f.queue.enqueue(&urgent);

    assert_eq!(f.queue.dequeue().unwrap().id, urgent.id);
}

#[test]
fn peek_does_not_consume() {
    let f = fixture();
    let job = f.add_job("only", 1, &[]);
    f.queue.enqueue(&job);

    assert_eq!(f.queue.peek().unwrap().id, job.id);
    assert_eq!(f.queue.ready_len(), 1);
    assert_eq!(f.queue.dequeue().unwrap().id, job.id);
}

#[test]
fn blocked_jobs_wait_in_pending() {
    let f = fixture();
    let dep = f.add_job("dep", 3, &[]);
    let blocked = f.add_job("blocked", 3, &["dep"]);

    f.queue.enqueue(&dep);
    assert_eq!(f.queue.enqueue(&blocked), EnqueueOutcome::Pending);
    assert_eq!(f.queue.ready_len(), 1);
    assert_eq!(f.queue.pending_len(), 1);

    // Only the dependency is dequeueable.
    assert_eq!(f.queue.dequeue().unwrap().id, dep.id);
    assert!(f.queue.dequeue().is_none());
}

#[test]
fn completion_promotes_dependents() {
    let f = fixture();
    let dep = f.add_job("dep", 3, &[]);
    let blocked = f.add_job("blocked", 3, &["dep"]);
    f.queue.enqueue(&dep);
    f.queue.enqueue(&blocked);
    assert_eq!(f.queue.dequeue().unwrap().id, dep.id);

    f.complete("dep");

    assert_eq!(f.queue.pending_len(), 0);
    assert_eq!(f.queue.dequeue().unwrap().id, blocked.id);
}

#[test]
fn notify_completion_is_idempotent() {
    let f = fixture();
    let dep = f.add_job("dep", 3, &[]);
    let blocked = f.add_job("blocked", 3, &["dep"]);
    f.queue.enqueue(&dep);
    f.queue.enqueue(&blocked);
    f.queue.dequeue();

    f.complete("dep");
    f.queue.notify_completion("dep");
    f.queue.notify_completion("dep");

    assert_eq!(f.queue.ready_len(), 1);
}

#[test]
fn partial_dependencies_keep_blocking() {
    let f = fixture();
    let a = f.add_job("a", 3, &[]);
    let b = f.add_job("b", 3, &[]);
    let both = f.add_job("both", 3, &["a", "b"]);
    f.queue.enqueue(&a);
    f.queue.enqueue(&b);
    f.queue.enqueue(&both);
    f.queue.dequeue();
    f.queue.dequeue();

    f.complete("a");
    assert_eq!(f.queue.pending_len(), 1, "one of two deps is not enough");

    f.complete("b");
    assert_eq!(f.queue.pending_len(), 0);
    assert_eq!(f.queue.dequeue().unwrap().id, both.id);
}

#[test]
fn failure_cascades_breadth_first() {
    // a <- b <- c and a <- d: failing a takes down all three dependents.
    let f = fixture();
    let a = f.add_job("a", 3, &[]);
    let b = f.add_job("b", 3, &["a"]);
    let c = f.add_job("c", 3, &["b"]);
    let d = f.add_job("d", 3, &["a"]);
    f.queue.enqueue(&a);
    f.queue.enqueue(&b);
    f.queue.enqueue(&c);
    f.queue.enqueue(&d);
    f.queue.dequeue();

    f.fail("a");

    assert_eq!(f.queue.pending_len(), 0);
    let b = f.store.get("b").unwrap();
    assert_eq!(b.status, cosa_core::JobStatus::Failed);
    assert_eq!(b.error.as_deref(), Some("dependency failed: a"));
    let c = f.store.get("c").unwrap();
    assert_eq!(c.error.as_deref(), Some("dependency failed: b"));
    let d = f.store.get("d").unwrap();
    assert_eq!(d.error.as_deref(), Some("dependency failed: a"));
}

#[test]
fn enqueue_on_failed_dependency_fails_immediately() {
    let f = fixture();
    let dep = f.add_job("dep", 3, &[]);
    f.queue.enqueue(&dep);
    f.queue.dequeue();
    f.fail("dep");

    let late = f.add_job("late", 3, &["dep"]);
    assert_eq!(f.queue.enqueue(&late), EnqueueOutcome::FailedCascade);
    let late = f.store.get("late").unwrap();
    assert_eq!(late.status, cosa_core::JobStatus::Failed);
    assert_eq!(late.error.as_deref(), Some("dependency failed: dep"));
}

#[test]
fn unknown_dependency_never_promotes() {
    let f = fixture();
    let ghost_dep = f.add_job("ghostly", 3, &["no-such-job"]);
    assert_eq!(f.queue.enqueue(&ghost_dep), EnqueueOutcome::Pending);

    f.queue.notify_completion("no-such-job");
    assert_eq!(f.queue.pending_len(), 1);
    assert!(f.queue.dequeue().is_none());
}

#[test]
fn terminal_jobs_are_rejected() {
    let f = fixture();
    let mut job = f.add_job("done", 3, &[]);
    let now = f.clock.now();
    f.store.update("done", |j| j.fail("x", now)).unwrap();
    job.status = cosa_core::JobStatus::Failed;

    assert_eq!(f.queue.enqueue(&job), EnqueueOutcome::FailedCascade);
    assert_eq!(f.queue.ready_len(), 0);
}

#[test]
fn remove_covers_both_pools() {
    let f = fixture();
    let ready = f.add_job("ready", 3, &[]);
    let dep = f.add_job("dep", 3, &[]);
    let blocked = f.add_job("blocked", 3, &["dep"]);
    f.queue.enqueue(&ready);
    f.queue.enqueue(&dep);
    f.queue.enqueue(&blocked);

    assert!(f.queue.remove("ready"));
    assert!(f.queue.remove("blocked"));
    assert!(!f.queue.remove("ghost"));
    assert_eq!(f.queue.pending_len(), 0);
    // dep is the only one left
    assert_eq!(f.queue.dequeue().unwrap().id, dep.id);
    assert!(f.queue.dequeue().is_none());
}

#[test]
fn get_ready_snapshot_is_ordered_and_non_destructive() {
    let f = fixture();
    for (id, priority) in [("p1", 1), ("p5", 5), ("p3", 3)] {
        let job = f.add_job(id, priority, &[]);
        f.queue.enqueue(&job);
    }

    let snapshot = f.queue.get_ready();
    let ids: Vec<&str> = snapshot.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, ["p5", "p3", "p1"]);
    assert_eq!(f.queue.ready_len(), 3);
}

proptest! {
    /// Queue ordering property: for distinct (priority, created_at)
    /// pairs, dequeue order is strictly (-priority, created_at).
    #[test]
    fn dequeue_order_is_total(specs in proptest::collection::vec((0i32..10, 0u32..1000), 1..40)) {
        let f = fixture();
        let mut jobs = Vec::new();
        for (i, (priority, age_offset)) in specs.iter().enumerate() {
            // Distinct created_at per job: advance between inserts.
            f.clock.advance_secs(*age_offset as i64 + 1);
            let job = f.add_job(&format!("job-{i}"), *priority, &[]);
            f.queue.enqueue(&job);
            jobs.push(job);
        }

        let mut expected: Vec<_> = jobs.iter().map(|j| (j.priority, j.created_at, j.id.as_str().to_string())).collect();
        expected.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)).then_with(|| a.2.cmp(&b.2)));

        let mut actual = Vec::new();
        while let Some(job) = f.queue.dequeue() {
            actual.push((job.priority, job.created_at, job.id.as_str().to_string()));
        }
        prop_assert_eq!(actual, expected);
    }
}
