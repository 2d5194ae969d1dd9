//! Command broadcast and notification fan-out.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use domain::document::{decode, encode};
use domain::models::command::SendCommandRequest;
use domain::models::member::Member;
use domain::models::{Command, NotificationKind, NotificationRecord};
use domain::services::Notifier;
use store::{paths, Query, RemoteStore, Snapshot, Subscription};
use validator::Validate;

use crate::config::CommandConfig;
use crate::error::CoordinationError;
use crate::notifications::NotificationOutbox;

/// Appends commands and distributes them to every member but the sender.
pub struct CommandService {
    store: Arc<dyn RemoteStore>,
    outbox: NotificationOutbox,
    window: usize,
}

impl CommandService {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        notifier: Arc<dyn Notifier>,
        config: CommandConfig,
    ) -> Self {
        Self {
            outbox: NotificationOutbox::new(Arc::clone(&store), notifier),
            store,
            window: config.window,
        }
    }

    /// Appends a command, then fans out per-recipient notifications.
    ///
    /// Fan-out is best-effort: a failure for one recipient degrades to a
    /// direct local notification for that recipient alone and never fails
    /// the send itself.
    pub async fn send(
        &self,
        group_id: Uuid,
        sender_id: Uuid,
        sender_name: &str,
        request: SendCommandRequest,
    ) -> Result<Command, CoordinationError> {
        request.validate()?;
        let message = request.resolved_message().ok_or_else(|| {
            CoordinationError::Validation("Custom commands require a message".to_string())
        })?;

        let command = Command {
            id: Uuid::new_v4(),
            group_id,
            sender_id,
            sender_name: sender_name.to_string(),
            kind: request.kind,
            message,
            timestamp: Utc::now(),
        };

        self.store
            .set_merge(&paths::command_doc(group_id, command.id), encode(&command)?)
            .await?;
        info!(
            command_id = %command.id,
            group_id = %group_id,
            kind = %command.kind,
            "Command appended"
        );

        self.fan_out(&command).await;
        Ok(command)
    }

    async fn fan_out(&self, command: &Command) {
        let member_docs = match self
            .store
            .query(&paths::members_collection(command.group_id), Query::new())
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                warn!(
                    command_id = %command.id,
                    error = %e,
                    "Fan-out skipped: membership unavailable"
                );
                counter!("command_fanout_failures_total").increment(1);
                return;
            }
        };

        for doc in member_docs {
            let member: Member = match decode(doc) {
                Ok(member) => member,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed member document in fan-out");
                    continue;
                }
            };
            if member.user_id == command.sender_id {
                continue;
            }

            let record = NotificationRecord::new(
                command.id,
                member.user_id,
                NotificationKind::Command,
                &command.sender_name,
                &command.message,
                command.timestamp,
            );
            let payload = json!({
                "group_id": command.group_id,
                "command_id": command.id,
                "kind": command.kind.as_str(),
            });
            self.outbox.deliver(command.group_id, record, payload).await;
        }
    }

    /// The live command window: most recent commands, newest first.
    pub async fn recent_commands(&self, group_id: Uuid) -> Result<Vec<Command>, CoordinationError> {
        let docs = self
            .store
            .query(
                &paths::commands_collection(group_id),
                Query::new().order_by_desc("timestamp").limit(self.window),
            )
            .await?;
        docs.into_iter()
            .map(|doc| decode::<Command>(doc).map_err(Into::into))
            .collect()
    }

    /// Subscribes to the live command window.
    pub async fn watch_commands(&self, group_id: Uuid) -> Result<CommandFeed, CoordinationError> {
        let (subscription, receiver) = self
            .store
            .subscribe(
                &paths::commands_collection(group_id),
                Query::new().order_by_desc("timestamp").limit(self.window),
            )
            .await?;
        Ok(CommandFeed {
            subscription,
            receiver,
        })
    }

    /// Unread notifications for one recipient, newest first.
    pub async fn unread_notifications(
        &self,
        group_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Vec<NotificationRecord>, CoordinationError> {
        let docs = self
            .store
            .query(
                &paths::notifications_collection(group_id, recipient_id),
                Query::new()
                    .filter("is_read", false)
                    .order_by_desc("created_at"),
            )
            .await?;
        docs.into_iter()
            .map(|doc| decode::<NotificationRecord>(doc).map_err(Into::into))
            .collect()
    }

    /// One-way unread-to-read transition for a recipient's notification.
    pub async fn mark_notification_read(
        &self,
        group_id: Uuid,
        recipient_id: Uuid,
        notification_id: &str,
    ) -> Result<(), CoordinationError> {
        let path = paths::notification_doc(group_id, recipient_id, notification_id);
        let doc = self.store.get(&path).await?.ok_or_else(|| {
            CoordinationError::NotFound(format!("notification {}", notification_id))
        })?;
        let record: NotificationRecord = decode(doc)?;
        if record.is_read {
            return Ok(());
        }
        self.store.set_merge(&path, json!({ "is_read": true })).await?;
        Ok(())
    }
}

/// Live feed of command window snapshots.
///
/// Owns the store subscription; dropping the feed releases it.
pub struct CommandFeed {
    subscription: Subscription,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
}

impl CommandFeed {
    /// The next full window snapshot, newest first. Malformed documents
    /// are dropped from the snapshot, never partially decoded.
    pub async fn next(&mut self) -> Option<Vec<Command>> {
        let snapshot = self.receiver.recv().await?;
        let mut commands = Vec::with_capacity(snapshot.len());
        for doc in snapshot {
            match decode::<Command>(doc) {
                Ok(command) => commands.push(command),
                Err(e) => warn!(error = %e, "Dropping malformed command document"),
            }
        }
        Some(commands)
    }

    /// Explicitly releases the subscription.
    pub fn stop(self) {
        self.subscription.stop();
    }
}
