// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only newline-JSON event ledger with in-memory fan-out.
//!
//! `append` is the durability point: once it returns, the event line is
//! on disk. Delivery to subscribers is best-effort — a subscriber whose
//! buffer is full loses the event (the ledger has already stored it) and
//! the miss is counted and logged.
//!
//! Each entry is a single line of JSON: `{"id":...,"type":...,"ts":...,"payload":...}`

use chrono::{DateTime, Utc};
use cosa_core::event::LedgerEvent;
use cosa_core::{Clock, EventId};
use parking_lot::{Mutex, RwLock};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default per-subscriber buffer depth.
pub const SUBSCRIBER_BUFFER: usize = 256;

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ledger is closed")]
    Closed,
}

struct Writer {
    file: Option<File>,
    /// Timestamps are clamped to be non-decreasing even if the wall
    /// clock steps backwards.
    last_ts: DateTime<Utc>,
}

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<LedgerEvent>,
    dropped: AtomicU64,
}

/// Handle returned by [`Ledger::subscribe`]. Dropping the receiver (or
/// calling [`Ledger::unsubscribe`]) detaches the subscriber.
pub struct LedgerSubscription {
    pub id: u64,
    pub rx: mpsc::Receiver<LedgerEvent>,
}

/// The append-only event log.
pub struct Ledger {
    path: PathBuf,
    writer: Mutex<Writer>,
    subscribers: RwLock<Vec<Subscriber>>,
    next_subscriber: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Open (or create) the ledger file at `path`.
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_owned(),
            writer: Mutex::new(Writer {
                file: Some(file),
                last_ts: DateTime::<Utc>::MIN_UTC,
            }),
            subscribers: RwLock::new(Vec::new()),
            next_subscriber: AtomicU64::new(1),
            clock,
        })
    }

    /// Append one event: assign an id and a UTC timestamp, write the
    /// line, then fan the event out to every subscriber.
    pub fn append(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<LedgerEvent, LedgerError> {
        let event = {
            let mut writer = self.writer.lock();
            if writer.file.is_none() {
                return Err(LedgerError::Closed);
            }

            let ts = self.clock.now().max(writer.last_ts);
            let event = LedgerEvent::new(
                EventId::new(uuid::Uuid::new_v4().to_string()),
                event_type,
                ts,
                payload,
            );

            let mut line = serde_json::to_vec(&event)?;
            line.push(b'\n');
            let file = writer.file.as_mut().ok_or(LedgerError::Closed)?;
            file.write_all(&line)?;
            file.flush()?;
            writer.last_ts = ts;
            event
        };

        self.fan_out(&event);
        Ok(event)
    }

    fn fan_out(&self, event: &LedgerEvent) {
        let subscribers = self.subscribers.read();
        for sub in subscribers.iter() {
            match sub.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let dropped = sub.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(
                        subscriber = sub.id,
                        dropped, "subscriber buffer full, dropping event"
                    );
                }
                // Receiver gone; unsubscribe will reap it.
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
    }

    /// Register a subscriber with the default buffer depth.
    pub fn subscribe(&self) -> LedgerSubscription {
        self.subscribe_with_buffer(SUBSCRIBER_BUFFER)
    }

    pub fn subscribe_with_buffer(&self, buffer: usize) -> LedgerSubscription {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().push(Subscriber {
            id,
            tx,
            dropped: AtomicU64::new(0),
        });
        LedgerSubscription { id, rx }
    }

    /// Remove a subscriber, logging its final drop count.
    pub fn unsubscribe(&self, id: u64) {
        let mut subscribers = self.subscribers.write();
        if let Some(pos) = subscribers.iter().position(|s| s.id == id) {
            let sub = subscribers.swap_remove(pos);
            let dropped = sub.dropped.load(Ordering::Relaxed);
            if dropped > 0 {
                debug!(subscriber = id, dropped, "unsubscribed with dropped events");
            }
        }
    }

    /// Full scan of the on-disk log. Malformed lines are skipped.
    pub fn read_all(&self) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.read_filtered(|_| true)
    }

    /// The most recent `n` events.
    pub fn tail(&self, n: usize) -> Result<Vec<LedgerEvent>, LedgerError> {
        let mut all = self.read_all()?;
        if all.len() > n {
            all.drain(..all.len() - n);
        }
        Ok(all)
    }

    /// Events at or after the given timestamp.
    pub fn since(&self, ts: DateTime<Utc>) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.read_filtered(|e| e.ts >= ts)
    }

    fn read_filtered(
        &self,
        keep: impl Fn(&LedgerEvent) -> bool,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let reader = BufReader::new(file);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerEvent>(trimmed) {
                Ok(event) => {
                    if keep(&event) {
                        events.push(event);
                    }
                }
                Err(_) => continue,
            }
        }
        Ok(events)
    }

    /// Close the ledger: further appends fail and every subscriber
    /// channel is closed.
    pub fn close(&self) {
        self.writer.lock().file = None;
        self.subscribers.write().clear();
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
