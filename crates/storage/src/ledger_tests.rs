// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cosa_core::FakeClock;
use serde_json::json;
use std::sync::Arc;

fn open_ledger(dir: &tempfile::TempDir) -> (Ledger, Arc<FakeClock>) {
    let clock = Arc::new(FakeClock::new());
    let ledger = Ledger::open(&dir.path().join("events.jsonl"), clock.clone()).unwrap();
    (ledger, clock)
}

#[test]
fn append_is_durable_before_returning() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, _clock) = open_ledger(&dir);

    let event = ledger
        .append("job.created", json!({"job_id": "job-1"}))
        .unwrap();

    let contents = std::fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
    assert!(contents.contains(event.id.as_str()));
    assert!(contents.contains("job.created"));
    assert!(contents.ends_with('\n'));
}

#[test]
fn ids_are_unique_and_timestamps_non_decreasing() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, clock) = open_ledger(&dir);

    let a = ledger.append("a", json!({})).unwrap();
    clock.advance_ms(5);
    let b = ledger.append("b", json!({})).unwrap();
    // Clock stepping backwards must not produce a backwards timestamp
    clock.advance_ms(-50);
    let c = ledger.append("c", json!({})).unwrap();

    assert_ne!(a.id, b.id);
    assert_ne!(b.id, c.id);
    assert!(b.ts >= a.ts);
    assert!(c.ts >= b.ts);
}

#[test]
fn read_all_round_trips_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, _clock) = open_ledger(&dir);

    for i in 0..5 {
        ledger.append("tick", json!({ "n": i })).unwrap();
    }

    let events = ledger.read_all().unwrap();
    assert_eq!(events.len(), 5);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.payload["n"], i);
    }
}

#[test]
fn malformed_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let (ledger, _clock) = {
        let clock = Arc::new(FakeClock::new());
        (Ledger::open(&path, clock.clone()).unwrap(), clock)
    };

    ledger.append("good", json!({})).unwrap();
    // Corrupt the log by hand
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(file, "{{not json").unwrap();
    writeln!(file).unwrap();
    drop(file);
    ledger.append("also-good", json!({})).unwrap();

    let events = ledger.read_all().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "good");
    assert_eq!(events[1].event_type, "also-good");
}

#[test]
fn tail_returns_most_recent() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, _clock) = open_ledger(&dir);

    for i in 0..10 {
        ledger.append("tick", json!({ "n": i })).unwrap();
    }

    let tail = ledger.tail(3).unwrap();
    assert_eq!(tail.len(), 3);
    assert_eq!(tail[0].payload["n"], 7);
    assert_eq!(tail[2].payload["n"], 9);
}

#[test]
fn since_filters_by_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, clock) = open_ledger(&dir);

    ledger.append("early", json!({})).unwrap();
    clock.advance_secs(60);
    let cutoff = clock.now();
    ledger.append("late", json!({})).unwrap();

    let events = ledger.since(cutoff).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "late");
}

#[tokio::test]
async fn subscribers_receive_appended_events() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, _clock) = open_ledger(&dir);

    let mut sub = ledger.subscribe();
    ledger.append("job.started", json!({"job_id": "job-1"})).unwrap();

    let event = sub.rx.recv().await.unwrap();
    assert_eq!(event.event_type, "job.started");
}

#[tokio::test]
async fn full_subscriber_drops_but_append_still_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, _clock) = open_ledger(&dir);

    let mut sub = ledger.subscribe_with_buffer(2);
    for i in 0..5 {
        ledger.append("tick", json!({ "n": i })).unwrap();
    }

    // Only the first two fit the buffer; the rest were dropped for this
    // subscriber but are all on disk.
    assert_eq!(sub.rx.recv().await.unwrap().payload["n"], 0);
    assert_eq!(sub.rx.recv().await.unwrap().payload["n"], 1);
    assert_eq!(ledger.read_all().unwrap().len(), 5);
}

#[test]
fn unsubscribe_detaches() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, _clock) = open_ledger(&dir);

    let sub = ledger.subscribe();
    ledger.unsubscribe(sub.id);
    // No panic, and further appends go nowhere
    ledger.append("tick", json!({})).unwrap();
}

#[test]
fn closed_ledger_rejects_appends() {
    let dir = tempfile::tempdir().unwrap();
    let (ledger, _clock) = open_ledger(&dir);

    ledger.close();
    assert!(matches!(
        ledger.append("tick", json!({})),
        Err(LedgerError::Closed)
    ));
}
