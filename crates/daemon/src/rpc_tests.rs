// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

#[test]
fn request_round_trip() {
    let request = RpcRequest::new(1, "job.add", Some(json!({"description": "x"})));
    let line = serde_json::to_string(&request).unwrap();
    let back: RpcRequest = serde_json::from_str(&line).unwrap();
    assert_eq!(back, request);
    assert_eq!(back.jsonrpc, "2.0");
}

#[parameterized(
    integer = { json!(7), true },
    string = { json!("req-1"), true },
    object = { json!({"n": 1}), false },
    array = { json!([1]), false },
    boolean = { json!(true), false },
)]
fn id_validation(id: serde_json::Value, valid: bool) {
    let request = RpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(id),
        method: "status".to_string(),
        params: None,
    };
    assert_eq!(request.has_valid_id(), valid);
}

#[test]
fn notifications_have_no_id() {
    let line = r#"{"jsonrpc":"2.0","method":"subscribe","params":{"events":["*"]}}"#;
    let request: RpcRequest = serde_json::from_str(line).unwrap();
    assert!(request.id.is_none());
    assert!(request.has_valid_id());
}

#[test]
fn success_response_omits_error() {
    let response = RpcResponse::ok(json!(1), json!({"ok": true}));
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["result"]["ok"], true);
    assert!(value.get("error").is_none());
}

#[test]
fn error_response_omits_result() {
    let response = RpcResponse::failure(json!("x"), RpcError::method_not_found("nope"));
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["error"]["code"], METHOD_NOT_FOUND);
    assert!(value["error"]["message"]
        .as_str()
        .unwrap()
        .contains("nope"));
    assert!(value.get("result").is_none());
}

#[test]
fn engine_errors_map_to_stable_codes() {
    use cosa_engine::EngineError;

    let cases: Vec<(EngineError, i64)> = vec![
        (EngineError::JobNotFound("x".into()), JOB_NOT_FOUND),
        (EngineError::WorkerNotFound("x".into()), WORKER_NOT_FOUND),
        (EngineError::OperationNotFound("x".into()), OPERATION_NOT_FOUND),
        (EngineError::ReviewNotFound("x".into()), REVIEW_NOT_FOUND),
        (EngineError::TerritoryExists("x".into()), TERRITORY_EXISTS),
        (EngineError::WorkerNameTaken("x".into()), TERRITORY_EXISTS),
        (EngineError::InvalidState("x".into()), INVALID_STATE),
        (EngineError::GateFailed("x".into()), GATE_FAILED),
        (EngineError::MergeConflict("x".into()), MERGE_CONFLICT),
        (EngineError::Internal("x".into()), INTERNAL_ERROR),
    ];
    for (error, code) in cases {
        assert_eq!(RpcError::from(error).code, code);
    }
}

#[tokio::test]
async fn frames_round_trip_over_a_buffer() {
    let request = RpcRequest::new("a", "status", None);
    let mut buffer = Vec::new();
    write_frame(&mut buffer, &request).await.unwrap();
    assert!(buffer.ends_with(b"\n"));

    let mut reader = tokio::io::BufReader::new(&buffer[..]);
    let line = read_frame(&mut reader).await.unwrap().unwrap();
    let back: RpcRequest = serde_json::from_str(&line).unwrap();
    assert_eq!(back, request);

    // EOF is a clean None.
    assert!(read_frame(&mut reader).await.unwrap().is_none());
}

#[tokio::test]
async fn oversized_frames_are_rejected() {
    let mut buffer = vec![b'x'; MAX_FRAME + 10];
    buffer.push(b'\n');
    let mut reader = tokio::io::BufReader::new(&buffer[..]);
    assert!(read_frame(&mut reader).await.is_err());
}
