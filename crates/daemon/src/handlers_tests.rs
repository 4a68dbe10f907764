// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::rpc;
use crate::test_support::fixture;
use serde_json::json;

async fn call(
    f: &crate::test_support::Fixture,
    method: &str,
    params: serde_json::Value,
) -> Result<Value, crate::rpc::RpcError> {
    dispatch(&f.deps, 1, method, Some(params)).await
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let f = fixture();
    let err = call(&f, "job.frobnicate", json!({})).await.unwrap_err();
    assert_eq!(err.code, rpc::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn malformed_params_are_invalid_params() {
    let f = fixture();
    let err = call(&f, "job.add", json!({"priority": "not-a-number"}))
        .await
        .unwrap_err();
    assert_eq!(err.code, rpc::INVALID_PARAMS);
}

#[tokio::test]
async fn status_reports_counts() {
    let f = fixture();
    call(&f, "worker.add", json!({"name": "paulie"})).await.unwrap();
    call(&f, "job.add", json!({"description": "x", "priority": 3}))
        .await
        .unwrap();

    let status = call(&f, "status", json!({})).await.unwrap();
    assert_eq!(status["workers"], 1);
    assert_eq!(status["jobs"]["pending"], 1);
    assert_eq!(status["queue_ready"], 1);
    assert_eq!(status["territory"], "testland");
    assert_eq!(status["total_cost"], "$0");
}

#[tokio::test]
async fn job_add_and_status_round_trip() {
    let f = fixture();
    let added = call(
        &f,
        "job.add",
        json!({"description": "wire the thing", "priority": 5}),
    )
    .await
    .unwrap();
    let id = added["id"].as_str().unwrap().to_string();
    assert_eq!(added["status"], "pending");

    let detail = call(&f, "job.status", json!({"id": id})).await.unwrap();
    assert_eq!(detail["description"], "wire the thing");
    assert_eq!(detail["priority"], 5);

    let err = call(&f, "job.status", json!({"id": "ghost"})).await.unwrap_err();
    assert_eq!(err.code, rpc::JOB_NOT_FOUND);
}

#[tokio::test]
async fn worker_lifecycle_over_the_wire() {
    let f = fixture();
    let added = call(&f, "worker.add", json!({"name": "paulie", "role": "capo"}))
        .await
        .unwrap();
    assert_eq!(added["role"], "capo");
    assert_eq!(added["status"], "idle");

    let err = call(&f, "worker.add", json!({"name": "paulie"})).await.unwrap_err();
    assert_eq!(err.code, rpc::TERRITORY_EXISTS, "name conflicts share the conflict code");

    let list = call(&f, "worker.list", json!({})).await.unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);

    call(&f, "order.set", json!({"worker": "paulie", "orders": ["be thorough"]}))
        .await
        .unwrap();
    let orders = call(&f, "order.list", json!({"worker": "paulie"})).await.unwrap();
    assert_eq!(orders, json!(["be thorough"]));
    let detail = call(&f, "worker.detail", json!({"name": "paulie"})).await.unwrap();
    assert_eq!(detail["standing_orders"], json!(["be thorough"]));

    call(&f, "worker.remove", json!({"name": "paulie"})).await.unwrap();
    let err = call(&f, "worker.status", json!({"name": "paulie"})).await.unwrap_err();
    assert_eq!(err.code, rpc::WORKER_NOT_FOUND);
}

#[tokio::test]
async fn invalid_role_is_invalid_params() {
    let f = fixture();
    let err = call(&f, "worker.add", json!({"name": "x", "role": "janitor"}))
        .await
        .unwrap_err();
    assert_eq!(err.code, rpc::INVALID_PARAMS);
}

#[tokio::test]
async fn territory_methods_round_trip() {
    let f = fixture();
    let status = call(&f, "territory.status", json!({})).await.unwrap();
    assert_eq!(status["name"], "testland");

    let err = call(
        &f,
        "territory.init",
        json!({"name": "testland", "repo_root": "/elsewhere"}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, rpc::TERRITORY_EXISTS);

    call(
        &f,
        "territory.setDevBranch",
        json!({"name": "testland", "branch": "develop"}),
    )
    .await
    .unwrap();
    let list = call(&f, "territory.list", json!({})).await.unwrap();
    assert_eq!(list[0]["dev_branch"], "develop");
    assert_eq!(list[0]["active"], true);
}

#[tokio::test]
async fn queue_status_exposes_head() {
    let f = fixture();
    call(&f, "job.add", json!({"description": "low", "priority": 1}))
        .await
        .unwrap();
    call(&f, "job.add", json!({"description": "high", "priority": 9}))
        .await
        .unwrap();

    let queue = call(&f, "queue.status", json!({})).await.unwrap();
    assert_eq!(queue["ready"], 2);
    assert_eq!(queue["next"]["description"], "high");
}

#[tokio::test]
async fn operation_create_spawns_member_jobs() {
    let f = fixture();
    let operation = call(
        &f,
        "operation.create",
        json!({
            "name": "cleanup",
            "jobs": [
                {"description": "sweep", "priority": 2},
                {"description": "mop", "priority": 1},
            ],
        }),
    )
    .await
    .unwrap();
    assert_eq!(operation["total"], 2);
    assert_eq!(operation["status"], "pending");

    let jobs = call(&f, "job.list", json!({})).await.unwrap();
    assert_eq!(jobs.as_array().unwrap().len(), 2);

    let id = operation["id"].as_str().unwrap();
    let cancelled = call(&f, "operation.cancel", json!({"id": id})).await.unwrap();
    assert_eq!(cancelled["status"], "cancelled");
}

#[tokio::test]
async fn review_status_for_unknown_job_is_review_not_found() {
    let f = fixture();
    let added = call(&f, "job.add", json!({"description": "x"})).await.unwrap();
    let err = call(&f, "review.status", json!({"job_id": added["id"]}))
        .await
        .unwrap_err();
    assert_eq!(err.code, rpc::REVIEW_NOT_FOUND);

    let list = call(&f, "review.list", json!({})).await.unwrap();
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn cancel_and_reset_over_the_wire() {
    let f = fixture();
    let added = call(&f, "job.add", json!({"description": "x"})).await.unwrap();
    let id = added["id"].as_str().unwrap().to_string();

    let cancelled = call(&f, "job.cancel", json!({"id": id})).await.unwrap();
    assert_eq!(cancelled["status"], "cancelled");

    let err = call(&f, "job.cancel", json!({"id": id})).await.unwrap_err();
    assert_eq!(err.code, rpc::INVALID_STATE);

    let reset = call(&f, "job.reset", json!({"id": id})).await.unwrap();
    assert_eq!(reset["status"], "pending");
}

#[tokio::test]
async fn handoff_returns_markdown() {
    let f = fixture();
    let result = call(&f, "handoff.generate", json!({})).await.unwrap();
    assert!(result["handoff"].as_str().unwrap().starts_with("# Handoff"));
}

#[tokio::test]
async fn chat_requires_a_session() {
    let f = fixture();
    let err = call(&f, "chat.send", json!({"message": "hi"})).await.unwrap_err();
    assert_eq!(err.code, rpc::INVALID_STATE);
}

#[tokio::test]
async fn shutdown_notifies_the_waiter() {
    let f = fixture();
    let shutdown = Arc::clone(&f.deps.shutdown);
    let result = call(&f, "shutdown", json!({})).await.unwrap();
    assert_eq!(result["shutting_down"], true);
    // notified() resolves immediately thanks to the stored permit.
    tokio::time::timeout(std::time::Duration::from_secs(1), shutdown.notified())
        .await
        .unwrap();
}
