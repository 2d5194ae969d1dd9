//! Member domain models for group participants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::group::MemberRole;
use super::location::Coordinate;

/// Self-reported status of a member within the group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Normal,
    Gathered,
    Deviated,
    Resting,
    Help,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Normal => "normal",
            MemberStatus::Gathered => "gathered",
            MemberStatus::Deviated => "deviated",
            MemberStatus::Resting => "resting",
            MemberStatus::Help => "help",
        }
    }
}

impl FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(MemberStatus::Normal),
            "gathered" => Ok(MemberStatus::Gathered),
            "deviated" => Ok(MemberStatus::Deviated),
            "resting" => Ok(MemberStatus::Resting),
            "help" => Ok(MemberStatus::Help),
            _ => Err(format!("Invalid member status: {}", s)),
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A participant in a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Member {
    pub user_id: Uuid,
    pub display_name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar_emoji: Option<String>,
    pub role: MemberRole,
    #[serde(default)]
    pub status: MemberStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub last_location: Option<Coordinate>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_location_update: Option<DateTime<Utc>>,
}

impl Member {
    /// Creates a fresh member with the given role and no location yet.
    pub fn new(user_id: Uuid, display_name: &str, role: MemberRole, joined_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            display_name: display_name.to_string(),
            nickname: None,
            avatar_emoji: None,
            role,
            status: MemberStatus::Normal,
            joined_at,
            last_location: None,
            last_location_update: None,
        }
    }

    /// The name other members see: nickname override if set, display name otherwise.
    pub fn shown_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.display_name)
    }
}

/// Request payload for editing a member's profile or status.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateMemberRequest {
    #[validate(length(max = 50, message = "Nickname must be at most 50 characters"))]
    pub nickname: Option<String>,

    #[validate(length(max = 10, message = "Avatar emoji must be at most 10 characters"))]
    pub avatar_emoji: Option<String>,

    pub status: Option<MemberStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_status_as_str() {
        assert_eq!(MemberStatus::Normal.as_str(), "normal");
        assert_eq!(MemberStatus::Gathered.as_str(), "gathered");
        assert_eq!(MemberStatus::Deviated.as_str(), "deviated");
        assert_eq!(MemberStatus::Resting.as_str(), "resting");
        assert_eq!(MemberStatus::Help.as_str(), "help");
    }

    #[test]
    fn test_member_status_from_str() {
        assert_eq!(
            MemberStatus::from_str("normal").unwrap(),
            MemberStatus::Normal
        );
        assert_eq!(MemberStatus::from_str("HELP").unwrap(), MemberStatus::Help);
        assert!(MemberStatus::from_str("lost").is_err());
    }

    #[test]
    fn test_shown_name_prefers_nickname() {
        let mut member = Member::new(
            Uuid::new_v4(),
            "Jana Kovacova",
            MemberRole::Follower,
            Utc::now(),
        );
        assert_eq!(member.shown_name(), "Jana Kovacova");

        member.nickname = Some("Janka".to_string());
        assert_eq!(member.shown_name(), "Janka");
    }

    #[test]
    fn test_member_document_round_trip() {
        let member = Member::new(Uuid::new_v4(), "Peter", MemberRole::Leader, Utc::now());
        let doc = serde_json::to_value(&member).unwrap();
        let back: Member = serde_json::from_value(doc).unwrap();
        assert_eq!(back.user_id, member.user_id);
        assert_eq!(back.role, MemberRole::Leader);
        assert_eq!(back.status, MemberStatus::Normal);
    }

    #[test]
    fn test_member_decode_missing_role_fails() {
        let doc = serde_json::json!({
            "user_id": Uuid::new_v4(),
            "display_name": "Peter",
            "joined_at": 1700000000000i64,
        });
        let result: Result<Member, _> = serde_json::from_value(doc);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_member_request_validation() {
        let valid = UpdateMemberRequest {
            nickname: Some("Janka".to_string()),
            avatar_emoji: Some("🚴".to_string()),
            status: Some(MemberStatus::Resting),
        };
        assert!(valid.validate().is_ok());

        let too_long = UpdateMemberRequest {
            nickname: Some("x".repeat(51)),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());
    }
}
