//! Find-request domain models for the visibility authorization workflow.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Status of a find request. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindRequestStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl FindRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindRequestStatus::Pending => "pending",
            FindRequestStatus::Approved => "approved",
            FindRequestStatus::Denied => "denied",
            FindRequestStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FindRequestStatus::Pending)
    }
}

impl FromStr for FindRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(FindRequestStatus::Pending),
            "approved" => Ok(FindRequestStatus::Approved),
            "denied" => Ok(FindRequestStatus::Denied),
            "expired" => Ok(FindRequestStatus::Expired),
            _ => Err(format!("Invalid find request status: {}", s)),
        }
    }
}

impl fmt::Display for FindRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request by one member to see another member's position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FindRequest {
    pub id: Uuid,
    pub group_id: Uuid,
    pub requester_id: Uuid,
    pub requester_name: String,
    pub target_id: Uuid,
    pub status: FindRequestStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl FindRequest {
    /// Creates a pending request with the given time-to-live.
    pub fn new(
        group_id: Uuid,
        requester_id: Uuid,
        requester_name: &str,
        target_id: Uuid,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            requester_id,
            requester_name: requester_name.to_string(),
            target_id,
            status: FindRequestStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
            approved_at: None,
        }
    }

    /// A request is logically expired once `now` is past its deadline,
    /// regardless of what status storage still holds.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
