// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ops;
use crate::test_helpers::{event_count, harness};
use cosa_core::JobId;
use std::time::Duration;

fn stuck_events(h: &crate::test_helpers::TestHarness) -> usize {
    event_count(h, "worker.stuck")
}

#[tokio::test]
async fn healthy_workers_are_left_alone() {
    let h = harness();
    let worker = ops::add_worker(&h.ctx, "w1", None).unwrap();
    worker.begin_job(&JobId::new("job-1")).unwrap();

    let monitor = HealthMonitor::new();
    monitor.sweep(&h.ctx);

    assert_eq!(stuck_events(&h), 0);
    assert_eq!(worker.status(), cosa_core::WorkerStatus::Working);
}

#[tokio::test]
async fn idle_workers_are_never_stuck() {
    let h = harness();
    let worker = ops::add_worker(&h.ctx, "w1", None).unwrap();
    worker.backdate_activity(Duration::from_secs(60 * 60));

    HealthMonitor::new().sweep(&h.ctx);
    assert_eq!(stuck_events(&h), 0);
}

#[tokio::test]
async fn warning_fires_once_per_ascent() {
    let h = harness();
    let worker = ops::add_worker(&h.ctx, "w1", None).unwrap();
    worker.begin_job(&JobId::new("job-1")).unwrap();
    worker.backdate_activity(Duration::from_secs(6 * 60));

    let monitor = HealthMonitor::new();
    monitor.sweep(&h.ctx);
    monitor.sweep(&h.ctx);
    monitor.sweep(&h.ctx);

    // One warning despite three sweeps; status untouched.
    assert_eq!(stuck_events(&h), 1);
    assert_eq!(worker.status(), cosa_core::WorkerStatus::Working);
}

#[tokio::test]
async fn error_tier_flips_status() {
    let h = harness();
    let worker = ops::add_worker(&h.ctx, "w1", None).unwrap();
    worker.begin_job(&JobId::new("job-1")).unwrap();
    worker.backdate_activity(Duration::from_secs(16 * 60));

    let monitor = HealthMonitor::new();
    monitor.sweep(&h.ctx);

    assert_eq!(worker.status(), cosa_core::WorkerStatus::Error);
    assert!(worker.current_job().is_none());
    assert_eq!(stuck_events(&h), 1);
}

#[tokio::test]
async fn critical_tier_stops_the_worker() {
    let h = harness();
    let worker = ops::add_worker(&h.ctx, "w1", None).unwrap();
    worker.begin_job(&JobId::new("job-1")).unwrap();
    worker.backdate_activity(Duration::from_secs(31 * 60));

    let monitor = HealthMonitor::new();
    monitor.sweep(&h.ctx);

    assert_eq!(worker.status(), cosa_core::WorkerStatus::Stopped);
    assert_eq!(stuck_events(&h), 1);
}

#[tokio::test]
async fn severity_escalates_across_sweeps() {
    let h = harness();
    let worker = ops::add_worker(&h.ctx, "w1", None).unwrap();
    worker.begin_job(&JobId::new("job-1")).unwrap();
    let monitor = HealthMonitor::new();

    worker.backdate_activity(Duration::from_secs(6 * 60));
    monitor.sweep(&h.ctx);
    assert_eq!(stuck_events(&h), 1);

    // Same worker, deeper silence: the next tier fires once.
    worker.backdate_activity(Duration::from_secs(16 * 60));
    monitor.sweep(&h.ctx);
    assert_eq!(stuck_events(&h), 2);
    assert_eq!(worker.status(), cosa_core::WorkerStatus::Error);
}

#[tokio::test]
async fn memory_clears_when_the_worker_recovers() {
    let h = harness();
    let worker = ops::add_worker(&h.ctx, "w1", None).unwrap();
    worker.begin_job(&JobId::new("job-1")).unwrap();
    let monitor = HealthMonitor::new();

    worker.backdate_activity(Duration::from_secs(6 * 60));
    monitor.sweep(&h.ctx);
    assert_eq!(stuck_events(&h), 1);

    // Fresh activity, then silence again: a new warning fires.
    worker.touch();
    monitor.sweep(&h.ctx);
    worker.finish_job();
    monitor.sweep(&h.ctx);
    worker.begin_job(&JobId::new("job-2")).unwrap();
    worker.backdate_activity(Duration::from_secs(6 * 60));
    monitor.sweep(&h.ctx);
    assert_eq!(stuck_events(&h), 2);
}

#[tokio::test]
async fn stuck_notification_respects_the_toggle() {
    let h = crate::test_helpers::harness_with(|config| {
        config.notifications.on_worker_stuck = true;
    });
    let worker = ops::add_worker(&h.ctx, "w1", None).unwrap();
    worker.begin_job(&JobId::new("job-1")).unwrap();
    worker.backdate_activity(Duration::from_secs(6 * 60));

    HealthMonitor::new().sweep(&h.ctx);
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].0.contains("stuck"));
}
