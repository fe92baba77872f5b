//! Boundary to the managed document store.
//!
//! The store is an opaque collaborator: this crate only subscribes to
//! ordered snapshots and issues create/update/delete calls. Transport,
//! retries and reconnection belong to the implementation behind
//! [`RemoteCollection`].

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::ErrorCode;

/// The four collections the console tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    Employees,
    Departments,
    Designations,
    Penalties,
}

impl CollectionKind {
    pub const ALL: [Self; 4] = [
        Self::Employees,
        Self::Departments,
        Self::Designations,
        Self::Penalties,
    ];

    /// Collection name in the remote store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Employees => "employees",
            Self::Departments => "departments",
            Self::Designations => "designations",
            Self::Penalties => "penalties",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document as the store hands it over: its id plus a schemaless field map.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Complete, point-in-time listing of every document matching a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<RawDocument>,
}

impl Snapshot {
    #[must_use]
    pub const fn new(documents: Vec<RawDocument>) -> Self {
        Self { documents }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Subscription query. The console only ever uses
/// [`CollectionQuery::created_at_desc`]: no pagination, no filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub order_by: String,
    pub direction: Direction,
}

impl CollectionQuery {
    #[must_use]
    pub fn created_at_desc() -> Self {
        Self {
            order_by: crate::model::record::CREATED_AT_FIELD.to_string(),
            direction: Direction::Descending,
        }
    }
}

impl Default for CollectionQuery {
    fn default() -> Self {
        Self::created_at_desc()
    }
}

/// One push from a live subscription.
#[derive(Debug, Clone)]
pub enum SnapshotEvent {
    Snapshot(Snapshot),
    Error(RemoteError),
}

/// Callback a live subscription pushes events into. It may be invoked from
/// any thread the store implementation chooses.
pub type SnapshotSink = Arc<dyn Fn(SnapshotEvent) + Send + Sync>;

/// Failures reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("{kind} document not found: {id}")]
    NotFound { kind: CollectionKind, id: String },
    #[error("remote store rejected the request: {0}")]
    Rejected(String),
}

impl RemoteError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unavailable(_) => ErrorCode::RemoteUnavailable,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::NotFound { .. } => ErrorCode::RecordNotFound,
            Self::Rejected(_) => ErrorCode::InvalidInput,
        }
    }
}

/// Handle to a live subscription. Dropping it cancels the subscription.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to tear down.
    #[must_use]
    pub const fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        self.cancel_in_place();
    }

    fn cancel_in_place(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_in_place();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// One ordered, schemaless document collection in the remote store.
pub trait RemoteCollection: Send + Sync {
    fn kind(&self) -> CollectionKind;

    /// Open a live subscription. Every change to the result set pushes a
    /// complete [`Snapshot`] into `sink`, in emission order.
    fn subscribe(
        &self,
        query: &CollectionQuery,
        sink: SnapshotSink,
    ) -> Result<Subscription, RemoteError>;

    /// Create a document and return its store-assigned id.
    fn create(&self, fields: Map<String, Value>) -> Result<String, RemoteError>;

    /// Merge `partial` into an existing document.
    fn update(&self, id: &str, partial: Map<String, Value>) -> Result<(), RemoteError>;

    fn delete(&self, id: &str) -> Result<(), RemoteError>;
}

/// The four collections a [`crate::store::SyncStore`] subscribes to.
#[derive(Clone)]
pub struct CollectionSet {
    pub employees: Arc<dyn RemoteCollection>,
    pub departments: Arc<dyn RemoteCollection>,
    pub designations: Arc<dyn RemoteCollection>,
    pub penalties: Arc<dyn RemoteCollection>,
}

impl CollectionSet {
    #[must_use]
    pub fn get(&self, kind: CollectionKind) -> &Arc<dyn RemoteCollection> {
        match kind {
            CollectionKind::Employees => &self.employees,
            CollectionKind::Departments => &self.departments,
            CollectionKind::Designations => &self.designations,
            CollectionKind::Penalties => &self.penalties,
        }
    }
}

impl fmt::Debug for CollectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(CollectionKind::ALL.iter().map(|kind| self.get(*kind).kind()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn kind_names_match_remote_collections() {
        let names: Vec<&str> = CollectionKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            ["employees", "departments", "designations", "penalties"]
        );
    }

    #[test]
    fn subscription_cancels_once_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(subscription);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_cancel_does_not_run_twice() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_query_orders_by_creation_desc() {
        let query = CollectionQuery::default();
        assert_eq!(query.order_by, "createdAt");
        assert_eq!(query.direction, Direction::Descending);
    }
}
