//! Integration tests for membership, leadership and live member sync.

mod common;

use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use common::{build_engine, display_name, user_id};
use domain::document::decode;
use domain::models::group::{Group, MemberRole};
use flock_engine::CoordinationError;
use store::{paths, RemoteStore};

/// Reads the group and its members straight from the store.
async fn load_group(store: &dyn RemoteStore, group_id: uuid::Uuid) -> Group {
    let doc = store
        .get(&paths::group_doc(group_id))
        .await
        .unwrap()
        .expect("group document missing");
    let mut group: Group = decode(doc).unwrap();
    let member_docs = store
        .query(&paths::members_collection(group_id), store::Query::new())
        .await
        .unwrap();
    group.members = member_docs
        .into_iter()
        .map(|d| decode(d).unwrap())
        .collect();
    group
}

fn assert_leader_invariant(group: &Group) {
    let leaders: Vec<_> = group
        .members
        .iter()
        .filter(|m| m.role == MemberRole::Leader)
        .collect();
    assert_eq!(leaders.len(), 1, "exactly one member must carry the leader role");
    assert_eq!(
        group.leader_id, leaders[0].user_id,
        "leader pointer must reference the member with the leader role"
    );
}

#[tokio::test]
async fn test_create_group_has_single_leader() {
    let engine = build_engine();
    let leader = user_id();

    let group = engine
        .membership
        .create_group("Sunday Ride", leader, &display_name())
        .await
        .unwrap();

    assert!(group.is_active);
    assert_eq!(group.leader_id, leader);
    assert_eq!(group.invite_code.len(), 11);

    let stored = load_group(engine.store.as_ref(), group.id).await;
    assert_eq!(stored.members.len(), 1);
    assert_leader_invariant(&stored);
}

#[tokio::test]
async fn test_create_group_rejects_empty_name() {
    let engine = build_engine();
    let result = engine
        .membership
        .create_group("", user_id(), &display_name())
        .await;
    assert!(matches!(result, Err(CoordinationError::Validation(_))));
}

#[tokio::test]
async fn test_join_group_adds_follower() {
    let engine = build_engine();
    let leader = user_id();
    let group = engine
        .membership
        .create_group("Sunday Ride", leader, &display_name())
        .await
        .unwrap();

    let follower = user_id();
    let member = engine
        .membership
        .join_group(&group.invite_code, follower, &display_name())
        .await
        .unwrap();
    assert_eq!(member.role, MemberRole::Follower);

    let stored = load_group(engine.store.as_ref(), group.id).await;
    assert_eq!(stored.members.len(), 2);
    assert_leader_invariant(&stored);
}

#[tokio::test]
async fn test_join_group_with_unknown_code_fails() {
    let engine = build_engine();
    let result = engine
        .membership
        .join_group("ZZZ-ZZZ-ZZZ", user_id(), &display_name())
        .await;
    assert!(matches!(result, Err(CoordinationError::InvalidInviteCode)));
}

#[tokio::test]
async fn test_join_group_with_expired_code_fails() {
    let engine = build_engine();
    let group = engine
        .membership
        .create_group("Sunday Ride", user_id(), &display_name())
        .await
        .unwrap();

    // Push the invite expiry into the past.
    engine
        .store
        .set_merge(
            &paths::group_doc(group.id),
            json!({
                "invite_expires_at": (Utc::now() - chrono::Duration::hours(1)).timestamp_millis()
            }),
        )
        .await
        .unwrap();

    let result = engine
        .membership
        .join_group(&group.invite_code, user_id(), &display_name())
        .await;
    assert!(matches!(result, Err(CoordinationError::InviteExpired)));

    // Membership set unchanged.
    let stored = load_group(engine.store.as_ref(), group.id).await;
    assert_eq!(stored.members.len(), 1);
}

#[tokio::test]
async fn test_join_group_twice_fails() {
    let engine = build_engine();
    let group = engine
        .membership
        .create_group("Sunday Ride", user_id(), &display_name())
        .await
        .unwrap();

    let follower = user_id();
    engine
        .membership
        .join_group(&group.invite_code, follower, &display_name())
        .await
        .unwrap();
    let result = engine
        .membership
        .join_group(&group.invite_code, follower, &display_name())
        .await;
    assert!(matches!(result, Err(CoordinationError::AlreadyMember)));

    let stored = load_group(engine.store.as_ref(), group.id).await;
    assert_eq!(stored.members.len(), 2);
}

#[tokio::test]
async fn test_leave_last_member_deactivates_group() {
    let engine = build_engine();
    let leader = user_id();
    let group = engine
        .membership
        .create_group("Sunday Ride", leader, &display_name())
        .await
        .unwrap();

    engine.membership.leave_group(group.id, leader).await.unwrap();

    let doc = engine
        .store
        .get(&paths::group_doc(group.id))
        .await
        .unwrap()
        .unwrap();
    let stored: Group = decode(doc).unwrap();
    assert!(!stored.is_active);
}

#[tokio::test]
async fn test_leader_leave_promotes_earliest_joiner() {
    let engine = build_engine();
    let leader = user_id();
    let group = engine
        .membership
        .create_group("Sunday Ride", leader, &display_name())
        .await
        .unwrap();

    let first_follower = user_id();
    engine
        .membership
        .join_group(&group.invite_code, first_follower, &display_name())
        .await
        .unwrap();
    // Joins must not share a millisecond for the election order to be visible.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second_follower = user_id();
    engine
        .membership
        .join_group(&group.invite_code, second_follower, &display_name())
        .await
        .unwrap();

    engine.membership.leave_group(group.id, leader).await.unwrap();

    let stored = load_group(engine.store.as_ref(), group.id).await;
    assert!(stored.is_active);
    assert_eq!(stored.members.len(), 2);
    assert_leader_invariant(&stored);
    assert_eq!(stored.leader_id, first_follower);
}

#[tokio::test]
async fn test_follower_leave_keeps_leader() {
    let engine = build_engine();
    let leader = user_id();
    let group = engine
        .membership
        .create_group("Sunday Ride", leader, &display_name())
        .await
        .unwrap();
    let follower = user_id();
    engine
        .membership
        .join_group(&group.invite_code, follower, &display_name())
        .await
        .unwrap();

    engine.membership.leave_group(group.id, follower).await.unwrap();

    let stored = load_group(engine.store.as_ref(), group.id).await;
    assert!(stored.is_active);
    assert_eq!(stored.members.len(), 1);
    assert_eq!(stored.leader_id, leader);
    assert_leader_invariant(&stored);
}

#[tokio::test]
async fn test_regenerate_invite_invalidates_old_code() {
    let engine = build_engine();
    let group = engine
        .membership
        .create_group("Sunday Ride", user_id(), &display_name())
        .await
        .unwrap();
    let old_code = group.invite_code.clone();

    let refreshed = engine.membership.regenerate_invite(group.id).await.unwrap();
    assert_ne!(refreshed.invite_code, old_code);

    let result = engine
        .membership
        .join_group(&old_code, user_id(), &display_name())
        .await;
    assert!(matches!(result, Err(CoordinationError::InvalidInviteCode)));

    engine
        .membership
        .join_group(&refreshed.invite_code, user_id(), &display_name())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_watch_delivers_member_resnapshots() {
    let engine = build_engine();
    let group = engine
        .membership
        .create_group("Sunday Ride", user_id(), &display_name())
        .await
        .unwrap();

    engine.membership.switch_to_group(group.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        engine.membership.current_group().await.unwrap().members.len(),
        1
    );

    engine
        .membership
        .join_group(&group.invite_code, user_id(), &display_name())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let current = engine.membership.current_group().await.unwrap();
    assert_eq!(current.members.len(), 2);
    assert!(engine.membership.last_sync_error().is_none());

    engine.membership.stop_watching().await;
}

#[tokio::test]
async fn test_watch_rederives_leader_from_roles() {
    let engine = build_engine();
    let leader = user_id();
    let group = engine
        .membership
        .create_group("Sunday Ride", leader, &display_name())
        .await
        .unwrap();
    let follower = user_id();
    engine
        .membership
        .join_group(&group.invite_code, follower, &display_name())
        .await
        .unwrap();

    engine.membership.switch_to_group(group.clone()).await.unwrap();

    // Promotion write lands while the pointer is still stale.
    engine
        .store
        .set_merge(
            &paths::member_doc(group.id, leader),
            json!({ "role": "follower" }),
        )
        .await
        .unwrap();
    engine
        .store
        .set_merge(
            &paths::member_doc(group.id, follower),
            json!({ "role": "leader" }),
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let current = engine.membership.current_group().await.unwrap();
    assert_eq!(current.leader_id, follower);

    engine.membership.stop_watching().await;
}

#[tokio::test]
async fn test_watch_keeps_last_good_on_malformed_snapshot() {
    let engine = build_engine();
    let group = engine
        .membership
        .create_group("Sunday Ride", user_id(), &display_name())
        .await
        .unwrap();

    engine.membership.switch_to_group(group.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // A member document missing required fields poisons the snapshot.
    engine
        .store
        .set_merge(
            &paths::member_doc(group.id, user_id()),
            json!({ "display_name": "ghost" }),
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let current = engine.membership.current_group().await.unwrap();
    assert_eq!(current.members.len(), 1, "last good membership preserved");
    assert!(engine.membership.last_sync_error().is_some());

    engine.membership.stop_watching().await;
}

#[tokio::test]
async fn test_refresh_keeps_last_good_on_malformed_group_doc() {
    let engine = build_engine();
    let group = engine
        .membership
        .create_group("Sunday Ride", user_id(), &display_name())
        .await
        .unwrap();
    engine.membership.switch_to_group(group.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Corrupt a required field of the group document.
    engine
        .store
        .set_merge(&paths::group_doc(group.id), json!({ "created_at": "soon" }))
        .await
        .unwrap();

    let refreshed = engine.membership.refresh_current_group().await.unwrap();
    assert_eq!(refreshed.unwrap().id, group.id);

    engine.membership.stop_watching().await;
}

#[tokio::test]
async fn test_record_location_updates_member() {
    let engine = build_engine();
    let leader = user_id();
    let group = engine
        .membership
        .create_group("Sunday Ride", leader, &display_name())
        .await
        .unwrap();

    engine
        .membership
        .record_location(
            group.id,
            leader,
            domain::models::Coordinate::new(48.1486, 17.1077),
            Utc::now(),
        )
        .await
        .unwrap();

    let stored = load_group(engine.store.as_ref(), group.id).await;
    let member = stored.member(leader).unwrap();
    let location = member.last_location.unwrap();
    assert!((location.latitude - 48.1486).abs() < 1e-9);
    assert!(member.last_location_update.is_some());
}

#[tokio::test]
async fn test_record_location_rejects_invalid_coordinate() {
    let engine = build_engine();
    let leader = user_id();
    let group = engine
        .membership
        .create_group("Sunday Ride", leader, &display_name())
        .await
        .unwrap();

    let result = engine
        .membership
        .record_location(
            group.id,
            leader,
            domain::models::Coordinate::new(91.0, 0.0),
            Utc::now(),
        )
        .await;
    assert!(matches!(result, Err(CoordinationError::Validation(_))));
}
