//! Document path helpers for the nested collection layout.
//!
//! Everything hangs off the group document: members, commands and find
//! requests are nested collections, notifications are nested one level
//! deeper under the recipient they belong to.

use uuid::Uuid;

/// Top-level collection of group documents.
pub const GROUPS: &str = "groups";

pub fn group_doc(group_id: Uuid) -> String {
    format!("groups/{}", group_id)
}

pub fn members_collection(group_id: Uuid) -> String {
    format!("groups/{}/members", group_id)
}

pub fn member_doc(group_id: Uuid, user_id: Uuid) -> String {
    format!("groups/{}/members/{}", group_id, user_id)
}

pub fn commands_collection(group_id: Uuid) -> String {
    format!("groups/{}/commands", group_id)
}

pub fn command_doc(group_id: Uuid, command_id: Uuid) -> String {
    format!("groups/{}/commands/{}", group_id, command_id)
}

pub fn find_requests_collection(group_id: Uuid) -> String {
    format!("groups/{}/find_requests", group_id)
}

pub fn find_request_doc(group_id: Uuid, request_id: Uuid) -> String {
    format!("groups/{}/find_requests/{}", group_id, request_id)
}

pub fn notifications_collection(group_id: Uuid, recipient_id: Uuid) -> String {
    format!("groups/{}/notifications/{}", group_id, recipient_id)
}

pub fn notification_doc(group_id: Uuid, recipient_id: Uuid, notification_id: &str) -> String {
    format!(
        "groups/{}/notifications/{}/{}",
        group_id, recipient_id, notification_id
    )
}
