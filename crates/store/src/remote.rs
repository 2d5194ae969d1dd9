//! The remote store trait.

use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::query::Query;
use crate::subscription::Subscription;

/// A loosely-typed store document.
pub type Document = serde_json::Value;

/// The full current result set of a query, delivered on every change.
pub type Snapshot = Vec<Document>;

/// A single operation inside a batched write.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Merge the document into the target path, creating it if absent.
    SetMerge { path: String, doc: Document },
    /// Delete the document at the target path.
    Delete { path: String },
}

/// An eventually-consistent remote document store.
///
/// Documents are addressed by slash-separated paths whose last segment is
/// the document id and whose prefix names the containing collection
/// (`groups/{gid}/members/{uid}`). Subscriptions are continuous: every
/// change to the watched collection re-delivers the full query result set,
/// not a diff. The returned [`Subscription`] guard owns the listener; the
/// caller must keep it alive for as long as updates are wanted.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Point read of a single document.
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError>;

    /// Merge-upsert a document: object fields merge recursively, anything
    /// else replaces. Creates the document if absent.
    async fn set_merge(&self, path: &str, doc: Document) -> Result<(), StoreError>;

    /// Delete a document. Deleting an absent document is not an error.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Apply a batch of writes atomically: either all land or none do.
    async fn write_batch(&self, writes: Vec<WriteOp>) -> Result<(), StoreError>;

    /// One-shot equality-filtered, ordered, limited query over a collection.
    async fn query(&self, collection: &str, query: Query) -> Result<Snapshot, StoreError>;

    /// Continuous subscription to a collection query. Delivers the current
    /// result set immediately and again after every change.
    async fn subscribe(
        &self,
        collection: &str,
        query: Query,
    ) -> Result<(Subscription, mpsc::UnboundedReceiver<Snapshot>), StoreError>;
}
