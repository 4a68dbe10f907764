// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ops::{self, JobDraft};
use crate::test_helpers::harness;
use cosa_core::Cost;

#[tokio::test]
async fn handoff_covers_territory_crew_jobs_and_events() {
    let h = harness();
    let worker = ops::add_worker(&h.ctx, "paulie", None).unwrap();
    worker.absorb_usage(Cost::parse("$1.25").unwrap(), 10).unwrap();
    ops::create_job(
        &h.ctx,
        JobDraft {
            description: "lay low for a while".to_string(),
            priority: 3,
            depends_on: Vec::new(),
        },
        None,
    )
    .unwrap();
    ops::create_operation(&h.ctx, "the-big-one", None, Vec::new()).unwrap();

    let brief = generate(&h.ctx);

    assert!(brief.starts_with("# Handoff"));
    assert!(brief.contains("**testland**"));
    assert!(brief.contains("**paulie**"));
    assert!(brief.contains("lay low for a while"));
    assert!(brief.contains("the-big-one"));
    assert!(brief.contains("$1.25"));
    assert!(brief.contains("## Recent events"));
    assert!(brief.contains("job.created"));
}

#[tokio::test]
async fn handoff_without_state_is_still_coherent() {
    let h = harness();
    let brief = generate(&h.ctx);
    assert!(brief.contains("No workers."));
    assert!(brief.contains("Total spend across the crew: $0"));
}
