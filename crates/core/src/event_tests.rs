// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{Clock, FakeClock};
use serde_json::json;

#[test]
fn serializes_type_tag() {
    let clock = FakeClock::new();
    let event = LedgerEvent::new(
        EventId::new("ev-1"),
        types::JOB_STARTED,
        clock.now(),
        json!({"job_id": "job-1"}),
    );

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "job.started");
    assert_eq!(value["id"], "ev-1");
    assert_eq!(value["payload"]["job_id"], "job-1");
}

#[test]
fn round_trips_through_a_jsonl_line() {
    let clock = FakeClock::new();
    let event = LedgerEvent::new(
        EventId::new("ev-2"),
        types::REVIEW_APPROVED,
        clock.now(),
        json!({"job_id": "job-1", "summary": "clean change"}),
    );

    let line = serde_json::to_string(&event).unwrap();
    let back: LedgerEvent = serde_json::from_str(&line).unwrap();
    assert_eq!(back, event);
}

#[test]
fn missing_payload_defaults_to_null() {
    let line = r#"{"id":"ev-3","type":"daemon.started","ts":"2026-01-01T00:00:00Z"}"#;
    let event: LedgerEvent = serde_json::from_str(line).unwrap();
    assert_eq!(event.payload, serde_json::Value::Null);
}
