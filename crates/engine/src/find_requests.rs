//! Find-request authorization state machine.
//!
//! `pending` is the only non-terminal state; `approved`, `denied` and
//! `expired` are terminal. Expiry is lazy: a pending request past its
//! deadline transitions when some reader observes it, never via a
//! background sweep.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use domain::document::decode;
use domain::models::find_request::FindRequestStatus;
use domain::models::group::Group;
use domain::models::{FindRequest, NotificationKind, NotificationRecord};
use domain::services::Notifier;
use store::{paths, Query, RemoteStore};

use crate::config::FindRequestConfig;
use crate::error::CoordinationError;
use crate::notifications::NotificationOutbox;

/// Drives the find-permission workflow between two members.
pub struct FindRequestService {
    store: Arc<dyn RemoteStore>,
    outbox: NotificationOutbox,
    ttl: Duration,
}

impl FindRequestService {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        notifier: Arc<dyn Notifier>,
        config: FindRequestConfig,
    ) -> Self {
        Self {
            outbox: NotificationOutbox::new(Arc::clone(&store), notifier),
            store,
            ttl: Duration::seconds(config.ttl_secs),
        }
    }

    /// Creates a find request from requester to target.
    ///
    /// With free-roam mode on, the request is approved before it is ever
    /// written, so no reader can observe it pending and the target gets no
    /// approval prompt; the requester is still notified of the approval.
    pub async fn create(
        &self,
        group_id: Uuid,
        requester_id: Uuid,
        requester_name: &str,
        target_id: Uuid,
    ) -> Result<FindRequest, CoordinationError> {
        if requester_id == target_id {
            return Err(CoordinationError::Validation(
                "Cannot request to find yourself".to_string(),
            ));
        }

        let group_doc = self
            .store
            .get(&paths::group_doc(group_id))
            .await?
            .ok_or_else(|| CoordinationError::NotFound(format!("group {}", group_id)))?;
        let group: Group = decode(group_doc)?;

        let now = Utc::now();
        let mut request =
            FindRequest::new(group_id, requester_id, requester_name, target_id, self.ttl, now);

        if group.settings.free_roam_mode {
            request.status = FindRequestStatus::Approved;
            request.approved_at = Some(now);
            self.write_request(&request).await?;
            info!(request_id = %request.id, "Find request auto-approved (free roam)");
            self.notify_requester_of_decision(&request).await;
        } else {
            self.write_request(&request).await?;
            info!(
                request_id = %request.id,
                target_id = %target_id,
                "Find request created, awaiting target"
            );
            self.notify_target(&request).await;
        }

        Ok(request)
    }

    /// `pending -> approved`, stamping the approval time and notifying the
    /// requester. Invalid for any other current state.
    pub async fn approve(
        &self,
        group_id: Uuid,
        request_id: Uuid,
        responder_id: Uuid,
    ) -> Result<FindRequest, CoordinationError> {
        let mut request = self.load_live(group_id, request_id).await?;
        self.check_respondable(&request, responder_id)?;

        let now = Utc::now();
        request.status = FindRequestStatus::Approved;
        request.approved_at = Some(now);
        self.store
            .set_merge(
                &paths::find_request_doc(group_id, request_id),
                json!({
                    "status": FindRequestStatus::Approved.as_str(),
                    "approved_at": now.timestamp_millis(),
                }),
            )
            .await?;
        info!(request_id = %request_id, "Find request approved");

        self.notify_requester_of_decision(&request).await;
        Ok(request)
    }

    /// `pending -> denied`. Invalid for any other current state.
    pub async fn deny(
        &self,
        group_id: Uuid,
        request_id: Uuid,
        responder_id: Uuid,
    ) -> Result<FindRequest, CoordinationError> {
        let mut request = self.load_live(group_id, request_id).await?;
        self.check_respondable(&request, responder_id)?;

        request.status = FindRequestStatus::Denied;
        self.store
            .set_merge(
                &paths::find_request_doc(group_id, request_id),
                json!({ "status": FindRequestStatus::Denied.as_str() }),
            )
            .await?;
        info!(request_id = %request_id, "Find request denied");

        self.notify_requester_of_decision(&request).await;
        Ok(request)
    }

    /// Reads one request, applying lazy expiry on the way out.
    pub async fn get(
        &self,
        group_id: Uuid,
        request_id: Uuid,
    ) -> Result<FindRequest, CoordinationError> {
        self.load_live(group_id, request_id).await
    }

    /// Pending requests addressed to one target, oldest first.
    ///
    /// Requests whose deadline has passed are transitioned to expired here
    /// and excluded from the result.
    pub async fn pending_for_target(
        &self,
        group_id: Uuid,
        target_id: Uuid,
    ) -> Result<Vec<FindRequest>, CoordinationError> {
        let docs = self
            .store
            .query(
                &paths::find_requests_collection(group_id),
                Query::new()
                    .filter("target_id", target_id.to_string())
                    .filter("status", FindRequestStatus::Pending.as_str())
                    .order_by_asc("created_at"),
            )
            .await?;

        let now = Utc::now();
        let mut live = Vec::with_capacity(docs.len());
        for doc in docs {
            let request: FindRequest = decode(doc)?;
            if request.is_expired(now) {
                self.expire(&request).await?;
                continue;
            }
            live.push(request);
        }
        Ok(live)
    }

    async fn load_live(
        &self,
        group_id: Uuid,
        request_id: Uuid,
    ) -> Result<FindRequest, CoordinationError> {
        let path = paths::find_request_doc(group_id, request_id);
        let doc = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| CoordinationError::NotFound(format!("find request {}", request_id)))?;
        let mut request: FindRequest = decode(doc)?;

        if request.status == FindRequestStatus::Pending && request.is_expired(Utc::now()) {
            self.expire(&request).await?;
            request.status = FindRequestStatus::Expired;
        }
        Ok(request)
    }

    async fn expire(&self, request: &FindRequest) -> Result<(), CoordinationError> {
        self.store
            .set_merge(
                &paths::find_request_doc(request.group_id, request.id),
                json!({ "status": FindRequestStatus::Expired.as_str() }),
            )
            .await?;
        info!(request_id = %request.id, "Find request lazily expired");
        Ok(())
    }

    fn check_respondable(
        &self,
        request: &FindRequest,
        responder_id: Uuid,
    ) -> Result<(), CoordinationError> {
        if request.status != FindRequestStatus::Pending {
            return Err(CoordinationError::Validation(format!(
                "Find request is {}, not pending",
                request.status
            )));
        }
        // Responses are scoped to the target's own identity. This is not a
        // cryptographic check of the caller.
        if request.target_id != responder_id {
            return Err(CoordinationError::Validation(
                "Only the target can respond to a find request".to_string(),
            ));
        }
        Ok(())
    }

    async fn notify_target(&self, request: &FindRequest) {
        let record = NotificationRecord::new(
            request.id,
            request.target_id,
            NotificationKind::FindRequest,
            &format!("{} wants to find you", request.requester_name),
            "Approve to share your position",
            request.created_at,
        );
        let payload = json!({
            "group_id": request.group_id,
            "request_id": request.id,
            "requester_id": request.requester_id,
        });
        self.outbox.deliver(request.group_id, record, payload).await;
    }

    async fn notify_requester_of_decision(&self, request: &FindRequest) {
        let body = match request.status {
            FindRequestStatus::Approved => "Your find request was approved",
            FindRequestStatus::Denied => "Your find request was denied",
            _ => return,
        };
        let record = NotificationRecord::new(
            request.id,
            request.requester_id,
            NotificationKind::FindRequestDecision,
            "Find request",
            body,
            Utc::now(),
        );
        let payload = json!({
            "group_id": request.group_id,
            "request_id": request.id,
            "status": request.status.as_str(),
        });
        self.outbox.deliver(request.group_id, record, payload).await;
    }

    async fn write_request(&self, request: &FindRequest) -> Result<(), CoordinationError> {
        self.store
            .set_merge(
                &paths::find_request_doc(request.group_id, request.id),
                domain::document::encode(request)?,
            )
            .await?;
        Ok(())
    }
}
