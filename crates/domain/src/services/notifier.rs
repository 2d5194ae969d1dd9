//! Local notification dispatcher abstraction.
//!
//! The engine schedules device-local notifications through this trait. The
//! real dispatcher lives in the embedding application; the mock
//! implementation here logs and records notifications for tests.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A notification handed to the platform dispatcher.
///
/// Scheduling the same id twice replaces the earlier notification rather
/// than duplicating it; the dispatcher must fire even while the app is
/// foregrounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LocalNotification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
}

/// Result of a notification dispatch attempt.
#[derive(Debug, Clone)]
pub enum NotifierResult {
    /// Notification was handed to the platform scheduler.
    Scheduled,
    /// Dispatch failed (non-blocking for the caller).
    Failed(String),
    /// Dispatch was intentionally skipped.
    Skipped,
}

/// Dispatcher for device-local notifications.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Schedule a notification. Same-id scheduling replaces, never duplicates.
    async fn schedule(&self, notification: LocalNotification) -> NotifierResult;

    /// Cancel a previously scheduled notification by id.
    async fn cancel(&self, id: &str);
}

/// Mock notification dispatcher for development and testing.
///
/// Records scheduled notifications but doesn't actually deliver them.
#[derive(Debug, Default)]
pub struct MockNotifier {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    scheduled: Mutex<Vec<LocalNotification>>,
    cancelled: Mutex<Vec<String>>,
}

impl MockNotifier {
    /// Create a new mock dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock dispatcher that simulates failures.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Snapshot of every currently scheduled notification.
    pub fn scheduled(&self) -> Vec<LocalNotification> {
        self.scheduled.lock().expect("notifier lock poisoned").clone()
    }

    /// Ids cancelled so far.
    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().expect("notifier lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl Notifier for MockNotifier {
    async fn schedule(&self, notification: LocalNotification) -> NotifierResult {
        if self.simulate_failure {
            tracing::warn!(
                id = %notification.id,
                "Mock notifier simulating dispatch failure"
            );
            return NotifierResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            id = %notification.id,
            title = %notification.title,
            "Mock: would schedule local notification"
        );

        let mut scheduled = self.scheduled.lock().expect("notifier lock poisoned");
        if let Some(existing) = scheduled.iter_mut().find(|n| n.id == notification.id) {
            *existing = notification;
        } else {
            scheduled.push(notification);
        }
        NotifierResult::Scheduled
    }

    async fn cancel(&self, id: &str) {
        let mut scheduled = self.scheduled.lock().expect("notifier lock poisoned");
        scheduled.retain(|n| n.id != id);
        self.cancelled
            .lock()
            .expect("notifier lock poisoned")
            .push(id.to_string());
    }
}
