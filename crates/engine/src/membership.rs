//! Membership and leadership management.
//!
//! Owns the group/member lifecycle: creation, invite-code joins, leaves
//! with leader election, and continuous synchronization of the member set
//! from the remote store into an in-memory group cache.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use domain::document::{decode, encode};
use domain::models::group::{elect_leader, CreateGroupRequest, Group, MemberRole};
use domain::models::invite::{generate_invite_code, JoinGroupRequest};
use domain::models::member::{Member, UpdateMemberRequest};
use domain::models::Coordinate;
use domain::DomainError;
use store::{paths, Query, RemoteStore, Snapshot, Subscription, WriteOp};

use crate::config::InviteConfig;
use crate::error::CoordinationError;

/// Manages group membership, leadership and the live member sync.
pub struct MembershipManager {
    store: Arc<dyn RemoteStore>,
    invites: InviteConfig,
    /// The currently selected group, kept fresh by the member watch task.
    current: Arc<RwLock<Option<Group>>>,
    /// Last subscription error. Populated without tearing the watch down.
    sync_error: Arc<std::sync::RwLock<Option<String>>>,
    watch: Mutex<Option<GroupWatch>>,
}

struct GroupWatch {
    subscription: Subscription,
    task: JoinHandle<()>,
}

impl MembershipManager {
    pub fn new(store: Arc<dyn RemoteStore>, invites: InviteConfig) -> Self {
        Self {
            store,
            invites,
            current: Arc::new(RwLock::new(None)),
            sync_error: Arc::new(std::sync::RwLock::new(None)),
            watch: Mutex::new(None),
        }
    }

    /// Creates a group with the caller as its sole member and leader.
    ///
    /// The group document and the founding member land in one batch.
    pub async fn create_group(
        &self,
        name: &str,
        leader_id: Uuid,
        leader_name: &str,
    ) -> Result<Group, CoordinationError> {
        CreateGroupRequest {
            name: name.to_string(),
        }
        .validate()?;

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
            leader_id,
            created_at: now,
            invite_code: generate_invite_code(),
            invite_expires_at: now + Duration::hours(self.invites.expiry_hours),
            is_active: true,
            settings: Default::default(),
            members: vec![Member::new(leader_id, leader_name, MemberRole::Leader, now)],
        };

        self.store
            .write_batch(vec![
                WriteOp::SetMerge {
                    path: paths::group_doc(group.id),
                    doc: encode(&group)?,
                },
                WriteOp::SetMerge {
                    path: paths::member_doc(group.id, leader_id),
                    doc: encode(&group.members[0])?,
                },
            ])
            .await?;

        info!(group_id = %group.id, leader_id = %leader_id, "Group created");
        Ok(group)
    }

    /// Joins an active group by invite code, as a follower.
    pub async fn join_group(
        &self,
        invite_code: &str,
        user_id: Uuid,
        user_name: &str,
    ) -> Result<Member, CoordinationError> {
        JoinGroupRequest {
            code: invite_code.to_string(),
        }
        .validate()
        .map_err(|_| CoordinationError::InvalidInviteCode)?;

        let matches = self
            .store
            .query(
                paths::GROUPS,
                Query::new()
                    .filter("invite_code", invite_code)
                    .filter("is_active", true)
                    .limit(1),
            )
            .await?;
        let group_doc = matches
            .into_iter()
            .next()
            .ok_or(CoordinationError::InvalidInviteCode)?;
        let group: Group = decode(group_doc)?;

        let now = Utc::now();
        if group.invite_expired(now) {
            return Err(CoordinationError::InviteExpired);
        }

        let members = self.load_members(group.id).await?;
        if members.iter().any(|m| m.user_id == user_id) {
            return Err(CoordinationError::AlreadyMember);
        }

        let member = Member::new(user_id, user_name, MemberRole::Follower, now);
        self.store
            .set_merge(&paths::member_doc(group.id, user_id), encode(&member)?)
            .await?;

        info!(group_id = %group.id, user_id = %user_id, "Member joined");
        Ok(member)
    }

    /// Removes a member, deactivating the group or transferring leadership
    /// as needed.
    ///
    /// The steps are ordered, non-transactional remote writes: remove the
    /// member, re-read the remainder, then conditionally promote and move
    /// the leader pointer. A crash in between leaves the leader pointer
    /// stale until the operation is retried; the sync path tolerates that
    /// window by deriving leadership from roles.
    pub async fn leave_group(&self, group_id: Uuid, user_id: Uuid) -> Result<(), CoordinationError> {
        let group_doc = self
            .store
            .get(&paths::group_doc(group_id))
            .await?
            .ok_or_else(|| CoordinationError::NotFound(format!("group {}", group_id)))?;
        let group: Group = decode(group_doc)?;

        let leaving_doc = self
            .store
            .get(&paths::member_doc(group_id, user_id))
            .await?
            .ok_or_else(|| CoordinationError::NotFound(format!("member {}", user_id)))?;
        let leaving: Member = decode(leaving_doc)?;

        self.store
            .delete(&paths::member_doc(group_id, user_id))
            .await?;

        let remaining = self.load_members(group_id).await?;

        if remaining.is_empty() {
            self.store
                .set_merge(&paths::group_doc(group_id), json!({ "is_active": false }))
                .await?;
            info!(group_id = %group_id, "Last member left, group deactivated");
            return Ok(());
        }

        let was_leader = leaving.role == MemberRole::Leader || group.leader_id == user_id;
        if was_leader {
            if let Some(successor) = elect_leader(&remaining) {
                let successor_id = successor.user_id;
                self.store
                    .set_merge(
                        &paths::member_doc(group_id, successor_id),
                        json!({ "role": MemberRole::Leader.as_str() }),
                    )
                    .await?;
                self.store
                    .set_merge(
                        &paths::group_doc(group_id),
                        json!({ "leader_id": successor_id }),
                    )
                    .await?;
                info!(
                    group_id = %group_id,
                    new_leader = %successor_id,
                    "Leadership transferred"
                );
            }
        }

        Ok(())
    }

    /// Issues a fresh invite code and expiry.
    ///
    /// The previous code stops working for new joins; already-joined
    /// members are unaffected.
    pub async fn regenerate_invite(&self, group_id: Uuid) -> Result<Group, CoordinationError> {
        let group_doc = self
            .store
            .get(&paths::group_doc(group_id))
            .await?
            .ok_or_else(|| CoordinationError::NotFound(format!("group {}", group_id)))?;
        let mut group: Group = decode(group_doc)?;

        group.invite_code = generate_invite_code();
        group.invite_expires_at = Utc::now() + Duration::hours(self.invites.expiry_hours);

        self.store
            .set_merge(
                &paths::group_doc(group_id),
                json!({
                    "invite_code": group.invite_code,
                    "invite_expires_at": group.invite_expires_at.timestamp_millis(),
                }),
            )
            .await?;

        info!(group_id = %group_id, "Invite code regenerated");
        Ok(group)
    }

    /// Toggles free-roam mode, recording who enabled it and when.
    pub async fn set_free_roam(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        enabled: bool,
    ) -> Result<(), CoordinationError> {
        let settings = if enabled {
            json!({
                "settings": {
                    "free_roam_mode": true,
                    "enabled_by": user_id,
                    "enabled_at": Utc::now().timestamp_millis(),
                }
            })
        } else {
            json!({
                "settings": {
                    "free_roam_mode": false,
                    "enabled_by": null,
                    "enabled_at": null,
                }
            })
        };
        self.store
            .set_merge(&paths::group_doc(group_id), settings)
            .await?;
        info!(group_id = %group_id, enabled, "Free-roam mode updated");
        Ok(())
    }

    /// Edits a member's nickname, avatar or status.
    pub async fn update_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        update: UpdateMemberRequest,
    ) -> Result<(), CoordinationError> {
        update.validate()?;

        let existing = self
            .store
            .get(&paths::member_doc(group_id, user_id))
            .await?
            .ok_or_else(|| CoordinationError::NotFound(format!("member {}", user_id)))?;
        let _: Member = decode(existing)?;

        let mut doc = serde_json::Map::new();
        if let Some(nickname) = update.nickname {
            doc.insert("nickname".to_string(), json!(nickname));
        }
        if let Some(avatar_emoji) = update.avatar_emoji {
            doc.insert("avatar_emoji".to_string(), json!(avatar_emoji));
        }
        if let Some(status) = update.status {
            doc.insert("status".to_string(), json!(status.as_str()));
        }
        if doc.is_empty() {
            return Ok(());
        }

        self.store
            .set_merge(
                &paths::member_doc(group_id, user_id),
                serde_json::Value::Object(doc),
            )
            .await?;
        Ok(())
    }

    /// Records a member's location sample.
    pub async fn record_location(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        coordinate: Coordinate,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), CoordinationError> {
        coordinate
            .validate()
            .map_err(|e| CoordinationError::Validation(e.to_string()))?;
        shared::validation::validate_location_timestamp(recorded_at)
            .map_err(|e| CoordinationError::Validation(e.to_string()))?;

        self.store
            .set_merge(
                &paths::member_doc(group_id, user_id),
                json!({
                    "last_location": {
                        "latitude": coordinate.latitude,
                        "longitude": coordinate.longitude,
                    },
                    "last_location_update": recorded_at.timestamp_millis(),
                }),
            )
            .await?;
        Ok(())
    }

    /// The cached group, if one is selected.
    pub async fn current_group(&self) -> Option<Group> {
        self.current.read().await.clone()
    }

    /// Last member-sync error, if the watch stream has seen one.
    pub fn last_sync_error(&self) -> Option<String> {
        self.sync_error
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Selects a group and starts the live member sync for it.
    pub async fn switch_to_group(&self, group: Group) -> Result<(), CoordinationError> {
        self.stop_watching().await;
        let group_id = group.id;
        *self.current.write().await = Some(group);
        self.start_watch(group_id).await
    }

    /// Re-reads the selected group and its members from the store.
    ///
    /// A malformed group or member document keeps the last good in-memory
    /// group instead of clearing the selection.
    pub async fn refresh_current_group(&self) -> Result<Option<Group>, CoordinationError> {
        let group_id = match self.current.read().await.as_ref().map(|g| g.id) {
            Some(id) => id,
            None => return Ok(None),
        };

        let group_doc = self.store.get(&paths::group_doc(group_id)).await?;
        let member_docs = self
            .store
            .query(&paths::members_collection(group_id), Query::new())
            .await?;

        let refreshed = match group_doc {
            Some(doc) => match decode::<Group>(doc) {
                Ok(mut group) => match decode_members(member_docs) {
                    Ok(members) => {
                        group.members = members;
                        if let Some(leader_id) = group.leader().map(|m| m.user_id) {
                            group.leader_id = leader_id;
                        }
                        Some(group)
                    }
                    Err(e) => {
                        warn!(group_id = %group_id, error = %e, "Malformed member document, keeping last good group");
                        None
                    }
                },
                Err(e) => {
                    warn!(group_id = %group_id, error = %e, "Malformed group document, keeping last good group");
                    None
                }
            },
            None => {
                warn!(group_id = %group_id, "Group document missing, keeping last good group");
                None
            }
        };

        match refreshed {
            Some(group) => {
                *self.current.write().await = Some(group.clone());
                Ok(Some(group))
            }
            None => Ok(self.current.read().await.clone()),
        }
    }

    /// Stops the live member sync, releasing the store subscription.
    pub async fn stop_watching(&self) {
        if let Some(watch) = self.watch.lock().await.take() {
            watch.subscription.stop();
            watch.task.abort();
        }
    }

    async fn start_watch(&self, group_id: Uuid) -> Result<(), CoordinationError> {
        let (subscription, mut rx) = self
            .store
            .subscribe(&paths::members_collection(group_id), Query::new())
            .await?;

        let current = Arc::clone(&self.current);
        let sync_error = Arc::clone(&self.sync_error);
        let task = tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                apply_member_snapshot(&current, &sync_error, snapshot).await;
            }
        });

        *self.watch.lock().await = Some(GroupWatch { subscription, task });
        Ok(())
    }

    async fn load_members(&self, group_id: Uuid) -> Result<Vec<Member>, CoordinationError> {
        let docs = self
            .store
            .query(&paths::members_collection(group_id), Query::new())
            .await?;
        decode_members(docs).map_err(Into::into)
    }
}

fn decode_members(docs: Snapshot) -> Result<Vec<Member>, DomainError> {
    docs.into_iter().map(decode::<Member>).collect()
}

/// Applies a full member resnapshot to the cached group.
///
/// Leadership is re-derived from the member carrying the leader role; the
/// stale pointer left by an interrupted leave sequence is only a fallback.
/// A malformed snapshot keeps the last good membership and records the
/// error without tearing down the subscription.
async fn apply_member_snapshot(
    current: &RwLock<Option<Group>>,
    sync_error: &std::sync::RwLock<Option<String>>,
    snapshot: Snapshot,
) {
    match decode_members(snapshot) {
        Ok(members) => {
            let mut guard = current.write().await;
            if let Some(group) = guard.as_mut() {
                group.members = members;
                if let Some(leader_id) = group.leader().map(|m| m.user_id) {
                    group.leader_id = leader_id;
                }
            }
            *sync_error.write().unwrap_or_else(|e| e.into_inner()) = None;
        }
        Err(e) => {
            warn!(error = %e, "Malformed member snapshot, keeping last good membership");
            *sync_error.write().unwrap_or_else(|e| e.into_inner()) = Some(e.to_string());
        }
    }
}
