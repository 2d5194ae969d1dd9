//! Per-recipient notification delivery shared by the services.

use std::sync::Arc;

use metrics::counter;
use tracing::warn;
use uuid::Uuid;

use domain::document::encode;
use domain::models::NotificationRecord;
use domain::services::{LocalNotification, Notifier, NotifierResult};
use store::{paths, RemoteStore};

/// Writes a notification record for its recipient and schedules the
/// matching local notification.
///
/// Delivery is best-effort by design: a failed record write degrades to the
/// direct local notification alone, and a failed dispatch is logged. The
/// caller's operation never fails because of fan-out.
pub(crate) struct NotificationOutbox {
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
}

impl NotificationOutbox {
    pub(crate) fn new(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub(crate) async fn deliver(
        &self,
        group_id: Uuid,
        record: NotificationRecord,
        payload: serde_json::Value,
    ) {
        let path = paths::notification_doc(group_id, record.recipient_id, &record.id);
        match encode(&record) {
            Ok(doc) => {
                if let Err(e) = self.store.set_merge(&path, doc).await {
                    warn!(
                        recipient_id = %record.recipient_id,
                        error = %e,
                        "Notification record write failed, falling back to direct notification"
                    );
                    counter!("notification_record_fallbacks_total").increment(1);
                }
            }
            Err(e) => {
                warn!(
                    recipient_id = %record.recipient_id,
                    error = %e,
                    "Notification record encoding failed, falling back to direct notification"
                );
            }
        }

        // The local notification goes out whether or not the record landed.
        let local = LocalNotification {
            id: record.id.clone(),
            title: record.title.clone(),
            body: record.body.clone(),
            payload,
        };
        if let NotifierResult::Failed(reason) = self.notifier.schedule(local).await {
            warn!(
                recipient_id = %record.recipient_id,
                reason,
                "Local notification dispatch failed"
            );
            counter!("notification_dispatch_failures_total").increment(1);
        }
    }
}
