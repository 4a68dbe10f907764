// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{Clock, FakeClock};
use yare::parameterized;

#[parameterized(
    soldier = { "soldier", WorkerRole::Soldier },
    capo = { "Capo", WorkerRole::Capo },
    consigliere = { "CONSIGLIERE", WorkerRole::Consigliere },
    lookout = { " lookout ", WorkerRole::Lookout },
    cleaner = { "cleaner", WorkerRole::Cleaner },
    underboss = { "underboss", WorkerRole::Underboss },
    associate = { "associate", WorkerRole::Associate },
    don = { "don", WorkerRole::Don },
)]
fn role_parses_case_insensitively(input: &str, expected: WorkerRole) {
    assert_eq!(input.parse::<WorkerRole>().unwrap(), expected);
}

#[test]
fn unknown_role_is_an_error() {
    assert!("boss".parse::<WorkerRole>().is_err());
    assert!("".parse::<WorkerRole>().is_err());
}

#[test]
fn role_display_round_trips() {
    for role in [
        WorkerRole::Soldier,
        WorkerRole::Capo,
        WorkerRole::Consigliere,
        WorkerRole::Lookout,
        WorkerRole::Cleaner,
        WorkerRole::Underboss,
        WorkerRole::Associate,
        WorkerRole::Don,
    ] {
        assert_eq!(role.to_string().parse::<WorkerRole>().unwrap(), role);
    }
}

#[parameterized(
    soldier = { WorkerRole::Soldier, true },
    capo = { WorkerRole::Capo, true },
    consigliere = { WorkerRole::Consigliere, false },
    lookout = { WorkerRole::Lookout, false },
    cleaner = { WorkerRole::Cleaner, false },
    underboss = { WorkerRole::Underboss, false },
    associate = { WorkerRole::Associate, false },
    don = { WorkerRole::Don, false },
)]
fn only_soldiers_and_capos_execute_jobs(role: WorkerRole, executes: bool) {
    assert_eq!(role.is_job_executor(), executes);
}

#[test]
fn busy_statuses() {
    assert!(WorkerStatus::Working.is_busy());
    assert!(WorkerStatus::Reviewing.is_busy());
    assert!(!WorkerStatus::Idle.is_busy());
    assert!(!WorkerStatus::Stopped.is_busy());
    assert!(!WorkerStatus::Error.is_busy());
}

#[test]
fn info_absorbs_usage() {
    let clock = FakeClock::new();
    let mut info = WorkerInfo::new(
        WorkerId::new("w-1"),
        "paulie",
        WorkerRole::Soldier,
        clock.now(),
    );

    info.absorb_usage(Cost::parse("$0.10").unwrap(), 100);
    info.absorb_usage(Cost::parse("$0.25").unwrap(), 50);

    assert_eq!(info.total_cost, Cost::parse("0.35").unwrap());
    assert_eq!(info.total_tokens, 150);
}

#[test]
fn info_serde_round_trip() {
    let clock = FakeClock::new();
    let mut info = WorkerInfo::new(
        WorkerId::new("w-1"),
        "paulie",
        WorkerRole::Capo,
        clock.now(),
    );
    info.standing_orders.push("run tests before finishing".to_string());
    info.session_id = Some(SessionId::new("s-abc"));
    info.jobs_completed = 4;
    info.jobs_failed = 1;

    let json = serde_json::to_string(&info).unwrap();
    let back: WorkerInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(back, info);
}
