// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cosa_core::{Clock, FakeClock, Session, SessionId, WorkerId};

fn session(id: &str, worker: &str, clock: &FakeClock) -> Session {
    Session::new(
        SessionId::new(id),
        WorkerId::new(format!("wid-{worker}")),
        worker,
        clock.now(),
    )
}

#[test]
fn save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    {
        let store = SessionStore::open(dir.path()).unwrap();
        store.save(session("s-abc", "paulie", &clock)).unwrap();
    }

    let store = SessionStore::open(dir.path()).unwrap();
    let loaded = store.get("s-abc").unwrap();
    assert_eq!(loaded.worker_name, "paulie");
    assert_eq!(loaded.session_id, SessionId::new("s-abc"));
}

#[test]
fn long_ids_with_shared_prefixes_do_not_alias() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let store = SessionStore::open(dir.path()).unwrap();

    // Same first 64 chars; a truncation-based filename would collide.
    let prefix = "x".repeat(80);
    let id_a = format!("{prefix}-alpha");
    let id_b = format!("{prefix}-beta");
    store.save(session(&id_a, "paulie", &clock)).unwrap();
    store.save(session(&id_b, "silvio", &clock)).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.get(&id_a).unwrap().worker_name, "paulie");
    assert_eq!(store.get(&id_b).unwrap().worker_name, "silvio");
}

#[test]
fn find_by_worker_name_prefers_most_recent() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let store = SessionStore::open(dir.path()).unwrap();

    store.save(session("s-old", "paulie", &clock)).unwrap();
    clock.advance_secs(60);
    store.save(session("s-new", "paulie", &clock)).unwrap();
    store.save(session("s-other", "silvio", &clock)).unwrap();

    let found = store.find_by_worker_name("paulie").unwrap();
    assert_eq!(found.session_id, SessionId::new("s-new"));
    assert!(store.find_by_worker_name("ghost").is_none());
}

#[test]
fn touch_updates_last_used() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let store = SessionStore::open(dir.path()).unwrap();
    store.save(session("s-abc", "paulie", &clock)).unwrap();

    clock.advance_secs(120);
    store.touch("s-abc", clock.now()).unwrap();

    assert_eq!(store.get("s-abc").unwrap().last_used, clock.now());
}

#[test]
fn purge_removes_only_stale_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let store = SessionStore::open(dir.path()).unwrap();

    store.save(session("s-stale", "paulie", &clock)).unwrap();
    clock.advance_secs(8 * 24 * 3600);
    store.save(session("s-fresh", "silvio", &clock)).unwrap();

    let cutoff = clock.now() - chrono::TimeDelta::seconds(7 * 24 * 3600);
    let purged = store.purge_older_than(cutoff).unwrap();

    assert_eq!(purged.len(), 1);
    assert_eq!(purged[0].session_id, SessionId::new("s-stale"));
    assert!(store.get("s-stale").is_none());
    assert!(store.get("s-fresh").is_some());
}
