//! In-memory reference implementation of the remote store.
//!
//! Used by tests and local development. Writes are serialized through an
//! internal lock; every mutation republishes the full result set of each
//! live subscription on the touched collection, matching the resnapshot
//! semantics of the production backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::metrics::OpTimer;
use crate::query::Query;
use crate::remote::{Document, RemoteStore, Snapshot, WriteOp};
use crate::subscription::Subscription;

struct Watcher {
    id: u64,
    query: Query,
    tx: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Document>>,
    watchers: HashMap<String, Vec<Watcher>>,
    next_watcher_id: u64,
    fail_writes_matching: Option<String>,
}

/// An in-memory document store with live resnapshot subscriptions.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects write failures for tests: any write to a path containing
    /// `pattern` fails with a backend error. Pass `None` to clear.
    pub fn fail_writes_matching(&self, pattern: Option<&str>) {
        self.write_inner().fail_writes_matching = pattern.map(str::to_string);
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn split_path(path: &str) -> Result<(&str, &str), StoreError> {
        match path.rsplit_once('/') {
            Some((collection, doc_id)) if !collection.is_empty() && !doc_id.is_empty() => {
                Ok((collection, doc_id))
            }
            _ => Err(StoreError::InvalidPath(path.to_string())),
        }
    }
}

fn check_write_allowed(inner: &Inner, path: &str) -> Result<(), StoreError> {
    if let Some(pattern) = &inner.fail_writes_matching {
        if path.contains(pattern.as_str()) {
            return Err(StoreError::Backend(format!(
                "injected write failure for {}",
                path
            )));
        }
    }
    Ok(())
}

/// Recursive merge-upsert: object fields merge, everything else replaces.
fn merge_into(target: &mut Document, incoming: Document) {
    match (target, incoming) {
        (Document::Object(existing), Document::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) if slot.is_object() && value.is_object() => {
                        merge_into(slot, value);
                    }
                    _ => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, incoming) => *slot = incoming,
    }
}

fn apply_set_merge(inner: &mut Inner, collection: &str, doc_id: &str, doc: Document) {
    let slot = inner
        .collections
        .entry(collection.to_string())
        .or_default()
        .entry(doc_id.to_string())
        .or_insert(Document::Object(Default::default()));
    merge_into(slot, doc);
}

/// Republishes the current result set to every watcher of a collection.
/// Watchers whose receiver is gone are pruned here.
fn notify_collection(inner: &mut Inner, collection: &str) {
    let docs: Vec<Document> = inner
        .collections
        .get(collection)
        .map(|m| m.values().cloned().collect())
        .unwrap_or_default();

    if let Some(watchers) = inner.watchers.get_mut(collection) {
        watchers.retain(|w| w.tx.send(w.query.apply(&docs)).is_ok());
    }
}

#[async_trait::async_trait]
impl RemoteStore for InMemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        let timer = OpTimer::new("get");
        let (collection, doc_id) = Self::split_path(path)?;
        let result = self
            .read_inner()
            .collections
            .get(collection)
            .and_then(|m| m.get(doc_id))
            .cloned();
        timer.record();
        Ok(result)
    }

    async fn set_merge(&self, path: &str, doc: Document) -> Result<(), StoreError> {
        let timer = OpTimer::new("set_merge");
        let (collection, doc_id) = Self::split_path(path)?;
        let mut inner = self.write_inner();
        check_write_allowed(&inner, path)?;
        apply_set_merge(&mut inner, collection, doc_id, doc);
        notify_collection(&mut inner, collection);
        timer.record();
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let timer = OpTimer::new("delete");
        let (collection, doc_id) = Self::split_path(path)?;
        let mut inner = self.write_inner();
        check_write_allowed(&inner, path)?;
        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|m| m.remove(doc_id));
        if removed.is_some() {
            notify_collection(&mut inner, collection);
        }
        timer.record();
        Ok(())
    }

    async fn write_batch(&self, writes: Vec<WriteOp>) -> Result<(), StoreError> {
        let timer = OpTimer::new("write_batch");
        let mut inner = self.write_inner();

        // Validate the whole batch before touching anything so a failing
        // batch lands nothing.
        let mut touched: Vec<String> = Vec::with_capacity(writes.len());
        for write in &writes {
            let path = match write {
                WriteOp::SetMerge { path, .. } => path,
                WriteOp::Delete { path } => path,
            };
            check_write_allowed(&inner, path)?;
            let (collection, _) = Self::split_path(path)?;
            touched.push(collection.to_string());
        }

        for write in writes {
            match write {
                WriteOp::SetMerge { path, doc } => {
                    let (collection, doc_id) = Self::split_path(&path)?;
                    apply_set_merge(&mut inner, collection, doc_id, doc);
                }
                WriteOp::Delete { path } => {
                    let (collection, doc_id) = Self::split_path(&path)?;
                    if let Some(m) = inner.collections.get_mut(collection) {
                        m.remove(doc_id);
                    }
                }
            }
        }

        touched.sort();
        touched.dedup();
        for collection in touched {
            notify_collection(&mut inner, &collection);
        }
        timer.record();
        Ok(())
    }

    async fn query(&self, collection: &str, query: Query) -> Result<Snapshot, StoreError> {
        let timer = OpTimer::new("query");
        let inner = self.read_inner();
        let docs: Vec<Document> = inner
            .collections
            .get(collection)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        let result = query.apply(&docs);
        timer.record();
        Ok(result)
    }

    async fn subscribe(
        &self,
        collection: &str,
        query: Query,
    ) -> Result<(Subscription, mpsc::UnboundedReceiver<Snapshot>), StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.write_inner();

        let id = inner.next_watcher_id;
        inner.next_watcher_id += 1;

        // Initial snapshot delivered before any change lands.
        let docs: Vec<Document> = inner
            .collections
            .get(collection)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        let _ = tx.send(query.apply(&docs));

        inner
            .watchers
            .entry(collection.to_string())
            .or_default()
            .push(Watcher { id, query, tx });

        let weak = Arc::downgrade(&self.inner);
        let watched = collection.to_string();
        let subscription = Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.write().unwrap_or_else(|e| e.into_inner());
                if let Some(watchers) = inner.watchers.get_mut(&watched) {
                    watchers.retain(|w| w.id != id);
                }
            }
        });

        tracing::debug!(collection = %collection, watcher = id, "Subscription registered");
        Ok((subscription, rx))
    }
}
