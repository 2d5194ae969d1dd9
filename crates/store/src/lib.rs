//! Remote synchronized store abstraction for the Flock coordination engine.
//!
//! This crate contains:
//! - The [`RemoteStore`] trait: point reads, merge-upsert writes, batched
//!   writes, filtered/ordered/limited queries, and live subscriptions that
//!   deliver a full result-set snapshot on every change
//! - Document path helpers for the nested collection layout
//! - An in-memory reference implementation used by tests and local runs
//! - Store operation timing metrics

pub mod error;
pub mod memory;
pub mod metrics;
pub mod paths;
pub mod query;
pub mod subscription;

mod remote;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use query::{Filter, OrderBy, Query};
pub use remote::{Document, RemoteStore, Snapshot, WriteOp};
pub use subscription::Subscription;
