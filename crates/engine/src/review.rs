// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Review coordinator: `Gates -> Diff -> Review -> Decision`.
//!
//! Runs asynchronously for one job sitting in `review`. Gates are the
//! configured build and test commands; any failure short-circuits. The
//! diff goes to the reviewer agent, whose answer is parsed into a
//! [`Verdict`]; approval merges, rejection spawns a revision job.

use crate::ctx::EngineCtx;
use crate::lifecycle;
use crate::worker::Worker;
use cosa_adapters::subprocess::{combined_output, run_with_timeout};
use cosa_adapters::MergeOutcome;
use cosa_core::event::types as event_types;
use cosa_core::{Job, JobId, JobSpec};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

/// Where an active review currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPhase {
    Gates,
    Diff,
    Review,
    Decision,
}

/// Active reviews keyed by job id; entries exist only while the state
/// machine runs.
#[derive(Default)]
pub struct ReviewRegistry {
    active: Mutex<HashMap<String, ReviewPhase>>,
}

impl ReviewRegistry {
    pub fn phase(&self, job_id: &str) -> Option<ReviewPhase> {
        self.active.lock().get(job_id).copied()
    }

    pub fn list(&self) -> Vec<(String, ReviewPhase)> {
        let mut entries: Vec<(String, ReviewPhase)> = self
            .active
            .lock()
            .iter()
            .map(|(id, phase)| (id.clone(), *phase))
            .collect();
        entries.sort();
        entries
    }

    fn set(&self, job_id: &str, phase: ReviewPhase) {
        self.active.lock().insert(job_id.to_string(), phase);
    }

    fn clear(&self, job_id: &str) {
        self.active.lock().remove(job_id);
    }
}

/// Parsed reviewer response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub approved: bool,
    pub summary: String,
    pub feedback: String,
    pub must_fix: Vec<String>,
}

/// Drive one review to a terminal state. The job must be in `review`
/// with its worker bound in `reviewing`.
pub async fn run_review(ctx: Arc<EngineCtx>, worker: Arc<Worker>, job_id: JobId) {
    ctx.reviews.set(job_id.as_str(), ReviewPhase::Gates);
    ctx.append_event(
        event_types::REVIEW_STARTED,
        json!({"job_id": job_id.as_str(), "worker": worker.name()}),
    );

    if let Err(reason) = drive(&ctx, &worker, &job_id).await {
        lifecycle::fail_job(&ctx, &worker, &job_id, &reason).await;
    }
    ctx.reviews.clear(job_id.as_str());
}

/// The state machine proper. An `Err` is the failure reason for the job.
async fn drive(ctx: &Arc<EngineCtx>, worker: &Arc<Worker>, job_id: &JobId) -> Result<(), String> {
    let job = ctx
        .jobs
        .get(job_id.as_str())
        .ok_or_else(|| "job disappeared during review".to_string())?;
    let worktree = job
        .worktree_path
        .clone()
        .ok_or_else(|| "no worktree to review".to_string())?;
    let branch = job
        .branch
        .clone()
        .ok_or_else(|| "no branch to review".to_string())?;
    let (repo_root, merge_target) = ctx
        .merge_context()
        .ok_or_else(|| "no territory initialized".to_string())?;

    // -- Gates --
    let gate_timeout = Duration::from_secs(ctx.config.review.gate_timeout_secs);
    let mut gate_summary = Vec::new();
    let gates = [
        ("build", ctx.config.gates.build.clone()),
        ("test", ctx.config.gates.test.clone()),
    ];
    for (name, command) in gates {
        let Some(command) = command else { continue };
        ctx.append_event(
            event_types::GATE_STARTED,
            json!({"job_id": job_id.as_str(), "gate": name, "command": command}),
        );
        match run_gate(&worktree, &command, gate_timeout).await {
            Ok(_) => {
                ctx.append_event(
                    event_types::GATE_PASSED,
                    json!({"job_id": job_id.as_str(), "gate": name}),
                );
                gate_summary.push(format!("{name}: passed"));
            }
            Err(output) => {
                ctx.append_event(
                    event_types::GATE_FAILED,
                    json!({"job_id": job_id.as_str(), "gate": name, "output": output}),
                );
                // Build failure skips tests; either failure ends the review.
                return Err(format!("gate {name} failed: {output}"));
            }
        }
    }

    // -- Diff --
    ctx.reviews.set(job_id.as_str(), ReviewPhase::Diff);
    let diff = ctx
        .vcs
        .diff_against(&worktree, &merge_target)
        .await
        .map_err(|e| format!("diff failed: {e}"))?;
    if diff.stats.files.is_empty() {
        return Err("no changes to review".to_string());
    }

    // -- Review --
    ctx.reviews.set(job_id.as_str(), ReviewPhase::Review);
    let prompt = review_prompt(
        &job,
        &merge_target,
        &worker.name(),
        &gate_summary,
        &diff.text,
        ctx.config.review.diff_limit,
    );
    let review_timeout = Duration::from_secs(ctx.config.review.review_timeout_secs);
    let response = ctx
        .reviewer
        .review(&prompt, review_timeout)
        .await
        .map_err(|e| format!("reviewer failed: {e}"))?;
    let verdict = parse_verdict(&response);

    // -- Decision --
    ctx.reviews.set(job_id.as_str(), ReviewPhase::Decision);
    if verdict.approved {
        approve(ctx, worker, job_id, &repo_root, &branch, &merge_target, &worktree, &verdict).await
    } else {
        reject(ctx, worker, job_id, &job, &verdict).await
    }
}

async fn run_gate(worktree: &Path, command: &str, timeout: Duration) -> Result<String, String> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(worktree);
    let output = run_with_timeout(cmd, timeout, "gate").await?;
    let combined = combined_output(&output);
    if output.status.success() {
        Ok(combined)
    } else {
        Err(combined)
    }
}

fn review_prompt(
    job: &Job,
    merge_target: &str,
    worker_name: &str,
    gate_summary: &[String],
    diff_text: &str,
    diff_limit: usize,
) -> String {
    let mut diff = diff_text.to_string();
    if diff.len() > diff_limit {
        let mut cut = diff_limit;
        while !diff.is_char_boundary(cut) {
            cut -= 1;
        }
        diff.truncate(cut);
        diff.push_str("\n…[truncated]");
    }

    let gates = if gate_summary.is_empty() {
        "none configured".to_string()
    } else {
        gate_summary.join(", ")
    };

    format!(
        "You are reviewing a change produced by worker `{worker_name}` \
         for merge into `{merge_target}`.\n\n\
         Task:\n{task}\n\n\
         Gates: {gates}\n\n\
         Diff:\n```diff\n{diff}\n```\n\n\
         Respond with exactly these sections:\n\
         DECISION: APPROVED or REJECTED\n\
         SUMMARY: one-paragraph assessment\n\
         FEEDBACK: concrete guidance for the author\n\
         MUST_FIX: comma- or newline-separated blockers, or the word none",
        task = job.description,
    )
}

#[allow(clippy::too_many_arguments)]
async fn approve(
    ctx: &Arc<EngineCtx>,
    worker: &Arc<Worker>,
    job_id: &JobId,
    repo_root: &Path,
    branch: &str,
    merge_target: &str,
    worktree: &Path,
    verdict: &Verdict,
) -> Result<(), String> {
    // Hold the merge lock from the conflict check through the merge so
    // no other job moves the shared repository HEAD in between.
    {
        let _merge_guard = ctx.merge_lock.lock().await;

        if ctx
            .vcs
            .has_conflicts(repo_root, branch, merge_target)
            .await
            .map_err(|e| format!("conflict check failed: {e}"))?
        {
            ctx.append_event(
                event_types::JOB_MERGE_CONFLICT,
                json!({"job_id": job_id.as_str(), "branch": branch}),
            );
            return Err(format!("merge conflict against {merge_target}"));
        }

        if let Err(e) = ctx.vcs.remove_worktree(repo_root, worktree).await {
            warn!(job_id = %job_id, error = %e, "worktree removal failed");
        }

        let message = format!("Merge job {} into {} (reviewed)", job_id.short(8), merge_target);
        match ctx
            .vcs
            .merge_branch(repo_root, branch, merge_target, &message)
            .await
            .map_err(|e| format!("merge failed: {e}"))?
        {
            MergeOutcome::Merged => {
                if let Err(e) = ctx.vcs.delete_branch(repo_root, branch).await {
                    warn!(branch, error = %e, "branch delete failed");
                }
                ctx.append_event(
                    event_types::JOB_MERGED,
                    json!({"job_id": job_id.as_str(), "branch": branch, "target": merge_target}),
                );
            }
            MergeOutcome::Conflict(detail) => {
                ctx.append_event(
                    event_types::JOB_MERGE_CONFLICT,
                    json!({"job_id": job_id.as_str(), "branch": branch, "detail": detail}),
                );
                return Err(format!("merge conflict against {merge_target}"));
            }
        }
    }

    let now = ctx.now();
    let completed = ctx
        .jobs
        .update(job_id.as_str(), move |job| {
            job.clear_worktree();
            job.complete(now)
        })
        .map_err(|e| format!("completion transition failed: {e}"))?;

    ctx.append_event(
        event_types::REVIEW_APPROVED,
        json!({"job_id": job_id.as_str(), "summary": &verdict.summary}),
    );
    lifecycle::finish_success(ctx, worker, &completed).await;
    Ok(())
}

async fn reject(
    ctx: &Arc<EngineCtx>,
    worker: &Arc<Worker>,
    job_id: &JobId,
    job: &Job,
    verdict: &Verdict,
) -> Result<(), String> {
    // The revision job embeds everything the next attempt needs.
    let mut description = format!(
        "Revise a rejected change.\n\nOriginal task:\n{}\n",
        job.description
    );
    if !verdict.summary.is_empty() {
        description.push_str(&format!("\nReviewer summary:\n{}\n", verdict.summary));
    }
    if !verdict.feedback.is_empty() {
        description.push_str(&format!("\nReviewer feedback:\n{}\n", verdict.feedback));
    }
    if !verdict.must_fix.is_empty() {
        description.push_str("\nMust fix:\n");
        for item in &verdict.must_fix {
            description.push_str(&format!("- {item}\n"));
        }
    }

    let mut feedback_lines = Vec::new();
    if !verdict.feedback.is_empty() {
        feedback_lines.push(verdict.feedback.clone());
    }
    feedback_lines.extend(verdict.must_fix.iter().cloned());

    let revision = Job::new(
        JobSpec {
            id: ctx.new_id(),
            description,
            priority: job.priority + 1,
            depends_on: Vec::new(),
            operation_id: job.operation_id.as_ref().map(|o| o.as_str().to_string()),
            revision_of: Some(job.id.as_str().to_string()),
            review_feedback: feedback_lines,
        },
        ctx.clock.as_ref(),
    );
    let revision_id = revision.id.clone();

    ctx.jobs
        .insert(revision.clone())
        .map_err(|e| format!("failed to create revision job: {e}"))?;
    if let Some(op_id) = &revision.operation_id {
        let rid = revision_id.clone();
        let _ = ctx.operations.update(op_id.as_str(), move |op| op.add_job(rid));
    }
    ctx.append_event(
        event_types::JOB_CREATED,
        json!({
            "job_id": revision_id.as_str(),
            "revision_of": job.id.as_str(),
            "priority": revision.priority,
        }),
    );
    ctx.queue.enqueue(&revision);

    ctx.append_event(
        event_types::REVIEW_REJECTED,
        json!({
            "job_id": job.id.as_str(),
            "revision": revision_id.as_str(),
            "summary": &verdict.summary,
            "must_fix": &verdict.must_fix,
        }),
    );
    info!(job_id = %job.id, revision = %revision_id, "review rejected, revision enqueued");

    lifecycle::fail_job(ctx, worker, job_id, "changes rejected by review").await;
    Ok(())
}

/// Parse the reviewer's labeled sections. Tolerates any case, missing
/// sections, and free-form approvals ("looks good", "lgtm").
pub fn parse_verdict(text: &str) -> Verdict {
    let summary = section(text, "SUMMARY").unwrap_or_default();
    let feedback = section(text, "FEEDBACK").unwrap_or_default();
    let must_fix = section(text, "MUST_FIX")
        .map(|raw| parse_must_fix(&raw))
        .unwrap_or_default();

    let approved = match section(text, "DECISION") {
        Some(decision) => {
            let lower = decision.to_lowercase();
            if lower.contains("reject") {
                false
            } else {
                lower.contains("approve")
            }
        }
        None => {
            // Missing decision defaults to rejected unless the free text
            // reads as an approval.
            let lower = text.to_lowercase();
            lower.contains("looks good") || lower.contains("lgtm") || lower.contains("approve")
        }
    };

    Verdict {
        approved,
        summary,
        feedback,
        must_fix,
    }
}

/// Extract the text between `LABEL:` and the next known label (or end).
fn section(text: &str, label: &str) -> Option<String> {
    const LABELS: [&str; 4] = ["DECISION", "SUMMARY", "FEEDBACK", "MUST_FIX"];
    // ASCII-only uppercase keeps byte offsets valid in the original text.
    let upper = text.to_ascii_uppercase();
    let marker = format!("{label}:");
    let start = upper.find(&marker)? + marker.len();

    let mut end = text.len();
    for other in LABELS {
        if other == label {
            continue;
        }
        let other_marker = format!("{other}:");
        if let Some(pos) = upper[start..].find(&other_marker) {
            end = end.min(start + pos);
        }
    }
    Some(text[start..end].trim().to_string())
}

fn parse_must_fix(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .map(|s| s.trim_start_matches('-').trim())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
