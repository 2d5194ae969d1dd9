//! Group domain models for coordinated location-sharing groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::member::Member;

/// Role within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Leader,
    Follower,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Leader => "leader",
            MemberRole::Follower => "follower",
        }
    }

    /// Returns true if this role can change group settings and promote members.
    pub fn can_manage_group(&self) -> bool {
        matches!(self, MemberRole::Leader)
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "leader" => Ok(MemberRole::Leader),
            "follower" => Ok(MemberRole::Follower),
            _ => Err(format!("Invalid member role: {}", s)),
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Group-wide settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupSettings {
    /// When enabled, find requests are auto-approved without a pending phase.
    #[serde(default)]
    pub free_roam_mode: bool,
    #[serde(default)]
    pub enabled_by: Option<Uuid>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub enabled_at: Option<DateTime<Utc>>,
}

/// A coordinated location-sharing group.
///
/// The stored group document does not embed the member set; members live in
/// a nested collection and are attached here by the membership manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub leader_id: Uuid,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub invite_code: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub invite_expires_at: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default)]
    pub settings: GroupSettings,
    #[serde(skip)]
    pub members: Vec<Member>,
}

impl Group {
    /// Returns true if the invite code can no longer be used to join.
    pub fn invite_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.invite_expires_at
    }

    /// Looks up a member by user id.
    pub fn member(&self, user_id: Uuid) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    /// Derives the current leader from the member set.
    ///
    /// The member carrying role=leader wins; the `leader_id` pointer is only
    /// a fallback for the transient window during a leave sequence where the
    /// promotion write has not landed yet. If several members carry the role,
    /// the one matching the pointer is preferred.
    pub fn leader(&self) -> Option<&Member> {
        let mut leaders = self.members.iter().filter(|m| m.role == MemberRole::Leader);
        match (leaders.next(), leaders.next()) {
            (Some(only), None) => Some(only),
            (None, _) => self.members.iter().find(|m| m.user_id == self.leader_id),
            (Some(first), Some(_)) => self
                .members
                .iter()
                .find(|m| m.role == MemberRole::Leader && m.user_id == self.leader_id)
                .or(Some(first)),
        }
    }
}

/// Picks the member to promote when the leader leaves.
///
/// Earliest `joined_at` wins, ties broken by smallest `user_id`, so every
/// replica electing over the same member set picks the same successor.
pub fn elect_leader(members: &[Member]) -> Option<&Member> {
    members.iter().min_by(|a, b| {
        a.joined_at
            .cmp(&b.joined_at)
            .then_with(|| a.user_id.cmp(&b.user_id))
    })
}

/// Request payload for creating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateGroupRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,
}
