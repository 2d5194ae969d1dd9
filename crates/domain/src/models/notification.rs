//! Per-recipient notification records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Command,
    FindRequest,
    FindRequestDecision,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Command => write!(f, "command"),
            NotificationKind::FindRequest => write!(f, "find_request"),
            NotificationKind::FindRequestDecision => write!(f, "find_request_decision"),
        }
    }
}

/// Derives the stable notification id for a (source, recipient) pair.
///
/// Repeated delivery attempts for the same pair produce the same id, so a
/// re-run of a fan-out cannot duplicate a scheduled notification.
pub fn notification_id(source_id: Uuid, recipient_id: Uuid) -> String {
    shared::crypto::derive_pair_id(&source_id.to_string(), &recipient_id.to_string())
}

/// A notification record stored under a single recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationRecord {
    pub id: String,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl NotificationRecord {
    /// Creates an unread record with a deterministically derived id.
    pub fn new(
        source_id: Uuid,
        recipient_id: Uuid,
        kind: NotificationKind,
        title: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: notification_id(source_id, recipient_id),
            recipient_id,
            kind,
            title: title.to_string(),
            body: body.to_string(),
            created_at: now,
            is_read: false,
        }
    }
}
