// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-framed JSON-RPC 2.0 envelope.
//!
//! Wire format: one JSON object per `\n`-terminated line. Requests carry
//! a scalar `id` (string or integer); notifications omit it. Responses
//! echo the `id` with either `result` or `error`.

use cosa_engine::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

/// Maximum accepted frame length (8 MiB).
pub const MAX_FRAME: usize = 8 * 1024 * 1024;

pub const JSONRPC_VERSION: &str = "2.0";

// Standard JSON-RPC 2.0 codes.
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

// Application codes.
pub const DAEMON_NOT_RUNNING: i64 = -32000;
pub const WORKER_NOT_FOUND: i64 = -32001;
pub const JOB_NOT_FOUND: i64 = -32002;
pub const INVALID_STATE: i64 = -32003;
pub const TERRITORY_EXISTS: i64 = -32004;
pub const REVIEW_NOT_FOUND: i64 = -32005;
pub const OPERATION_NOT_FOUND: i64 = -32006;
pub const GATE_FAILED: i64 = -32007;
pub const MERGE_CONFLICT: i64 = -32008;

/// One incoming frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub jsonrpc: String,
    /// Scalar id; absent for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// A valid id is a string or an integer; anything else is an
    /// invalid request.
    pub fn has_valid_id(&self) -> bool {
        match &self.id {
            None => true,
            Some(Value::String(_)) | Some(Value::Number(_)) => true,
            Some(_) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// One outgoing response frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcErrorBody {
                code: error.code,
                message: error.message,
                data: error.data,
            }),
        }
    }
}

/// Server-to-client notification (no id, no reply expected).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

impl RpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A handler-level error carrying its wire code.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("unknown method: {method}"))
    }

    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self::new(INVALID_PARAMS, format!("invalid params: {detail}"))
    }
}

impl From<EngineError> for RpcError {
    fn from(e: EngineError) -> Self {
        let code = match &e {
            EngineError::JobNotFound(_) => JOB_NOT_FOUND,
            EngineError::WorkerNotFound(_) => WORKER_NOT_FOUND,
            EngineError::OperationNotFound(_) => OPERATION_NOT_FOUND,
            EngineError::ReviewNotFound(_) => REVIEW_NOT_FOUND,
            EngineError::TerritoryExists(_) | EngineError::WorkerNameTaken(_) => TERRITORY_EXISTS,
            EngineError::TerritoryNotFound(_) | EngineError::NoTerritory => INVALID_STATE,
            EngineError::InvalidState(_) | EngineError::Domain(_) => INVALID_STATE,
            EngineError::GateFailed(_) => GATE_FAILED,
            EngineError::MergeConflict(_) => MERGE_CONFLICT,
            EngineError::Store(_)
            | EngineError::Agent(_)
            | EngineError::Vcs(_)
            | EngineError::Internal(_) => INTERNAL_ERROR,
        };
        RpcError::new(code, e.to_string())
    }
}

/// Read one `\n`-terminated frame. `Ok(None)` on clean EOF.
pub async fn read_frame<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> std::io::Result<Option<String>> {
    let mut limited = reader.take(MAX_FRAME as u64 + 1);
    let mut line = String::new();
    let n = limited.read_line(&mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    if n > MAX_FRAME {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "frame exceeds maximum length",
        ));
    }
    Ok(Some(line))
}

/// Write one value as a `\n`-terminated frame.
pub async fn write_frame<W: AsyncWriteExt + Unpin, T: Serialize>(
    writer: &mut W,
    value: &T,
) -> std::io::Result<()> {
    let mut bytes = serde_json::to_vec(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
