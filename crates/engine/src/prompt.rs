// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt composition for job execution.

use cosa_core::{Job, WorkerInfo, WorkerRole};

/// Role preamble: who the worker is and how it should carry itself.
pub fn role_preamble(role: WorkerRole) -> &'static str {
    match role {
        WorkerRole::Soldier => {
            "You are a soldier: a hands-on coding agent. You take a task, \
             do the work in the current checkout, and commit your changes."
        }
        WorkerRole::Capo => {
            "You are a capo: a senior coding agent trusted with the harder \
             jobs. Work carefully, keep commits clean, and leave the tree \
             better than you found it."
        }
        WorkerRole::Consigliere => {
            "You are the consigliere: an advisor. You review work and give \
             candid, specific counsel."
        }
        WorkerRole::Lookout => "You are the lookout: you watch and report.",
        WorkerRole::Cleaner => "You are the cleaner: you tidy up what others leave behind.",
        WorkerRole::Underboss => {
            "You are the underboss: you coordinate work across the crew."
        }
        WorkerRole::Associate => {
            "You are an associate: a junior agent. Keep changes small and ask \
             via commit messages when unsure."
        }
        WorkerRole::Don => "You are the don. You delegate; you do not touch code.",
    }
}

/// Build the full first-turn prompt for a job: preamble, standing
/// orders, reviewer feedback (revision jobs), the task itself, and the
/// merge-target closing instruction.
pub fn compose_job_prompt(info: &WorkerInfo, job: &Job, merge_target: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(role_preamble(info.role));
    prompt.push_str("\n\n");

    if !info.standing_orders.is_empty() {
        prompt.push_str("Standing orders:\n");
        for order in &info.standing_orders {
            prompt.push_str("- ");
            prompt.push_str(order);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    if !job.review_feedback.is_empty() {
        prompt.push_str("Reviewer feedback on the previous attempt:\n");
        for line in &job.review_feedback {
            prompt.push_str("- ");
            prompt.push_str(line);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    prompt.push_str("## Task\n\n");
    prompt.push_str(&job.description);
    prompt.push_str("\n\n");

    prompt.push_str(&format!(
        "Work in the current directory and commit your changes to the \
         current branch. Your work will be merged into `{merge_target}` \
         when it passes review."
    ));
    prompt
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
