// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop notification boundary.
//!
//! Delivery is fire-and-forget: a failed notification is logged and
//! forgotten, never surfaced to the caller.

use tracing::debug;

pub trait Notifier: Send + Sync {
    fn notify(&self, summary: &str, body: &str);
}

/// Sends real desktop notifications.
#[derive(Debug, Clone, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, summary: &str, body: &str) {
        if let Err(e) = notify_rust::Notification::new()
            .summary(summary)
            .body(body)
            .appname("cosa")
            .show()
        {
            debug!(error = %e, "desktop notification failed");
        }
    }
}

/// Swallows everything (headless environments, tests that don't care).
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _summary: &str, _body: &str) {}
}

/// Records notifications for assertions.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeNotifier {
    sent: parking_lot::Mutex<Vec<(String, String)>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Notifier for FakeNotifier {
    fn notify(&self, summary: &str, body: &str) {
        self.sent
            .lock()
            .push((summary.to_string(), body.to_string()));
    }
}
