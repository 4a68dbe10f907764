// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket listener: accepts connections, frames requests in and
//! responses out, and forwards ledger events to subscribed connections.
//!
//! Each connection gets a read task and a writer channel; responses and
//! `log.entry` notifications share the writer so frames never interleave.

use crate::handlers::{self, HandlerDeps};
use crate::rpc::{self, RpcNotification, RpcRequest, RpcResponse};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub type ConnId = u64;

/// Writer-channel depth per connection.
const WRITER_BUFFER: usize = 256;

struct ConnEntry {
    tx: mpsc::Sender<String>,
    /// `None` until the client subscribes; `["*"]` matches everything.
    filter: Option<Vec<String>>,
}

/// Connection table shared between the accept loop, the handlers, and
/// the ledger forwarder.
#[derive(Default)]
pub struct Subscriptions {
    connections: Mutex<HashMap<ConnId, ConnEntry>>,
    next_id: AtomicU64,
}

impl Subscriptions {
    fn register(&self, tx: mpsc::Sender<String>) -> ConnId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections
            .lock()
            .insert(id, ConnEntry { tx, filter: None });
        id
    }

    fn deregister(&self, id: ConnId) {
        self.connections.lock().remove(&id);
    }

    pub fn subscribe(&self, id: ConnId, filter: Vec<String>) {
        if let Some(entry) = self.connections.lock().get_mut(&id) {
            entry.filter = Some(filter);
        }
    }

    pub fn unsubscribe(&self, id: ConnId) {
        if let Some(entry) = self.connections.lock().get_mut(&id) {
            entry.filter = None;
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.connections
            .lock()
            .values()
            .filter(|e| e.filter.is_some())
            .count()
    }

    /// Send a pre-serialized frame to every subscriber whose filter
    /// accepts the event type. Best-effort.
    fn broadcast(&self, event_type: &str, frame: &str) {
        let connections = self.connections.lock();
        for (id, entry) in connections.iter() {
            let Some(filter) = &entry.filter else { continue };
            let matches = filter
                .iter()
                .any(|f| f == "*" || f == event_type);
            if !matches {
                continue;
            }
            if entry.tx.try_send(frame.to_string()).is_err() {
                debug!(conn = id, "subscriber writer full, dropping notification");
            }
        }
    }

    /// Close every connection's writer (shutdown).
    pub fn close_all(&self) {
        self.connections.lock().clear();
    }
}

/// The accept loop plus the ledger forwarder.
pub struct Listener {
    socket: UnixListener,
    deps: Arc<HandlerDeps>,
}

impl Listener {
    pub fn new(socket: UnixListener, deps: Arc<HandlerDeps>) -> Self {
        Self { socket, deps }
    }

    /// Run until the engine's cancellation token fires.
    pub async fn run(self) {
        let cancel = self.deps.engine.cancel.clone();

        // One ledger subscription feeds every connection.
        let forwarder_subs = Arc::clone(&self.deps.subs);
        let subscription = self.deps.engine.ledger.subscribe();
        let forwarder_cancel = cancel.clone();
        self.deps.engine.tracker.spawn(forward_events(
            subscription,
            forwarder_subs,
            forwarder_cancel,
        ));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.socket.accept() => match accepted {
                    Ok((stream, _)) => {
                        let deps = Arc::clone(&self.deps);
                        self.deps.engine.tracker.spawn(async move {
                            handle_connection(stream, deps).await;
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept error");
                    }
                }
            }
        }
        info!("listener stopped");
    }
}

/// Drain the ledger subscription into `log.entry` notifications.
async fn forward_events(
    mut subscription: cosa_storage::LedgerSubscription,
    subs: Arc<Subscriptions>,
    cancel: tokio_util::sync::CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = subscription.rx.recv() => {
                let Some(event) = event else { break };
                let notification = RpcNotification::new(
                    "log.entry",
                    match serde_json::to_value(&event) {
                        Ok(value) => value,
                        Err(e) => {
                            warn!(error = %e, "unserializable ledger event");
                            continue;
                        }
                    },
                );
                match serde_json::to_string(&notification) {
                    Ok(frame) => subs.broadcast(&event.event_type, &frame),
                    Err(e) => warn!(error = %e, "notification serialization failed"),
                }
            }
        }
    }
}

/// One connection: spawn its writer, then loop over request frames.
async fn handle_connection(stream: UnixStream, deps: Arc<HandlerDeps>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let (tx, mut rx) = mpsc::channel::<String>(WRITER_BUFFER);
    let conn_id = deps.subs.register(tx.clone());
    debug!(conn = conn_id, "client connected");

    // Writer task: everything leaving this connection funnels through
    // one channel.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            use tokio::io::AsyncWriteExt;
            if write_half.write_all(frame.as_bytes()).await.is_err() {
                break;
            }
            if write_half.write_all(b"\n").await.is_err() {
                break;
            }
            let _ = write_half.flush().await;
        }
    });

    let cancel = deps.engine.cancel.clone();
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = rpc::read_frame(&mut reader) => frame,
        };
        match frame {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                if let Some(response) = process_frame(&deps, conn_id, &line).await {
                    let Ok(serialized) = serde_json::to_string(&response) else {
                        continue;
                    };
                    if tx.send(serialized).await.is_err() {
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(conn = conn_id, error = %e, "read error");
                break;
            }
        }
    }

    deps.subs.deregister(conn_id);
    drop(tx);
    let _ = writer.await;
    debug!(conn = conn_id, "client disconnected");
}

/// Parse and dispatch one frame. `None` means no response is owed
/// (notification or unparseable-without-id).
async fn process_frame(
    deps: &Arc<HandlerDeps>,
    conn_id: ConnId,
    line: &str,
) -> Option<RpcResponse> {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            return Some(RpcResponse::failure(
                Value::Null,
                rpc::RpcError::new(rpc::PARSE_ERROR, format!("parse error: {e}")),
            ));
        }
    };

    if request.jsonrpc != rpc::JSONRPC_VERSION || !request.has_valid_id() {
        return Some(RpcResponse::failure(
            request.id.unwrap_or(Value::Null),
            rpc::RpcError::new(rpc::INVALID_REQUEST, "invalid request"),
        ));
    }

    if matches!(request.method.as_str(), "subscribe" | "unsubscribe") {
        debug!(conn = conn_id, method = %request.method, "request");
    } else {
        info!(conn = conn_id, method = %request.method, "request");
    }

    let result = handlers::dispatch(deps, conn_id, &request.method, request.params).await;
    let id = request.id?; // notifications get no response
    Some(match result {
        Ok(value) => RpcResponse::ok(id, value),
        Err(error) => RpcResponse::failure(id, error),
    })
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
