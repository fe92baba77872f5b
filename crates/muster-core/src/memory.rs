//! In-process [`RemoteCollection`] implementation.
//!
//! Behaves like the managed store as far as the console can observe: every
//! write pushes a fresh, complete snapshot to each live subscriber, ids are
//! 20-character random strings, and updates merge field by field. Events
//! reach subscribers in the order the writes happened, whichever threads make
//! them. It also lets callers inject subscription and write failures.

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::remote::{
    CollectionKind, CollectionQuery, Direction, RawDocument, RemoteCollection, RemoteError,
    Snapshot, SnapshotEvent, SnapshotSink, Subscription,
};

const GENERATED_ID_LEN: usize = 20;

struct Subscriber {
    query: CollectionQuery,
    sink: SnapshotSink,
}

#[derive(Default)]
struct Inner {
    documents: Vec<RawDocument>,
    subscribers: BTreeMap<u64, Subscriber>,
    next_subscriber: u64,
    subscribe_failure: Option<RemoteError>,
    write_failure: Option<RemoteError>,
    outbox: VecDeque<Delivery>,
    draining: bool,
}

type Delivery = Vec<(SnapshotSink, SnapshotEvent)>;

/// Thread-safe in-memory document collection.
#[derive(Clone)]
pub struct InMemoryCollection {
    kind: CollectionKind,
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryCollection {
    #[must_use]
    pub fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Insert or replace a document under a caller-chosen id.
    pub fn put(&self, id: impl Into<String>, fields: Map<String, Value>) {
        let id = id.into();
        {
            let mut inner = lock(&self.inner);
            if let Some(pos) = inner.documents.iter().position(|doc| doc.id == id) {
                inner.documents[pos].fields = fields;
            } else {
                inner.documents.push(RawDocument::new(id, fields));
            }
            queue_snapshots(&mut inner);
        }
        self.flush();
    }

    /// Fields of one document, if present.
    #[must_use]
    pub fn document(&self, id: &str) -> Option<Map<String, Value>> {
        lock(&self.inner)
            .documents
            .iter()
            .find(|doc| doc.id == id)
            .map(|doc| doc.fields.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.inner).documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }

    /// Make future `subscribe` calls fail with `error` (or succeed again on `None`).
    pub fn set_subscribe_failure(&self, error: Option<RemoteError>) {
        lock(&self.inner).subscribe_failure = error;
    }

    /// Make future writes fail with `error` (or succeed again on `None`).
    pub fn set_write_failure(&self, error: Option<RemoteError>) {
        lock(&self.inner).write_failure = error;
    }

    /// Push an error event to every live subscriber, as a dropped connection would.
    pub fn fail_subscribers(&self, error: &RemoteError) {
        {
            let mut inner = lock(&self.inner);
            let delivery: Delivery = inner
                .subscribers
                .values()
                .map(|sub| (Arc::clone(&sub.sink), SnapshotEvent::Error(error.clone())))
                .collect();
            inner.outbox.push_back(delivery);
        }
        self.flush();
    }

    fn check_write(&self) -> Result<(), RemoteError> {
        lock(&self.inner).write_failure.clone().map_or(Ok(()), Err)
    }

    /// Deliver queued events in emission order, outside the lock.
    ///
    /// Only one caller drains at a time. Events queued meanwhile, including
    /// writes a sink makes while it runs, are delivered by that caller.
    fn flush(&self) {
        {
            let mut inner = lock(&self.inner);
            if inner.draining {
                return;
            }
            inner.draining = true;
        }
        loop {
            let next = {
                let mut inner = lock(&self.inner);
                let Some(delivery) = inner.outbox.pop_front() else {
                    inner.draining = false;
                    return;
                };
                delivery
            };
            for (sink, event) in next {
                sink(event);
            }
        }
    }
}

impl RemoteCollection for InMemoryCollection {
    fn kind(&self) -> CollectionKind {
        self.kind
    }

    fn subscribe(
        &self,
        query: &CollectionQuery,
        sink: SnapshotSink,
    ) -> Result<Subscription, RemoteError> {
        let key = {
            let mut inner = lock(&self.inner);
            if let Some(error) = inner.subscribe_failure.clone() {
                return Err(error);
            }
            let key = inner.next_subscriber;
            inner.next_subscriber += 1;
            inner.subscribers.insert(
                key,
                Subscriber {
                    query: query.clone(),
                    sink: Arc::clone(&sink),
                },
            );
            let initial = ordered_snapshot(&inner.documents, query);
            inner
                .outbox
                .push_back(vec![(sink, SnapshotEvent::Snapshot(initial))]);
            key
        };
        self.flush();

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).subscribers.remove(&key);
            }
        }))
    }

    fn create(&self, fields: Map<String, Value>) -> Result<String, RemoteError> {
        self.check_write()?;
        let id = generate_id();
        {
            let mut inner = lock(&self.inner);
            inner.documents.push(RawDocument::new(id.clone(), fields));
            queue_snapshots(&mut inner);
        }
        self.flush();
        Ok(id)
    }

    fn update(&self, id: &str, partial: Map<String, Value>) -> Result<(), RemoteError> {
        self.check_write()?;
        {
            let mut inner = lock(&self.inner);
            let Some(doc) = inner.documents.iter_mut().find(|doc| doc.id == id) else {
                return Err(RemoteError::NotFound {
                    kind: self.kind,
                    id: id.to_string(),
                });
            };
            doc.fields.extend(partial);
            queue_snapshots(&mut inner);
        }
        self.flush();
        Ok(())
    }

    /// Deleting a missing document succeeds without emitting a snapshot.
    fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.check_write()?;
        {
            let mut inner = lock(&self.inner);
            let before = inner.documents.len();
            inner.documents.retain(|doc| doc.id != id);
            if inner.documents.len() == before {
                return Ok(());
            }
            queue_snapshots(&mut inner);
        }
        self.flush();
        Ok(())
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_ID_LEN)
        .map(char::from)
        .collect()
}

// Queued under the same lock as the write, so queue order is write order.
fn queue_snapshots(inner: &mut Inner) {
    let delivery: Delivery = inner
        .subscribers
        .values()
        .map(|sub| {
            let snapshot = ordered_snapshot(&inner.documents, &sub.query);
            (Arc::clone(&sub.sink), SnapshotEvent::Snapshot(snapshot))
        })
        .collect();
    if !delivery.is_empty() {
        inner.outbox.push_back(delivery);
    }
}

/// Stable sort on the query field; documents missing it sort last.
fn ordered_snapshot(documents: &[RawDocument], query: &CollectionQuery) -> Snapshot {
    let mut ordered = documents.to_vec();
    ordered.sort_by(|a, b| {
        let left = a.fields.get(&query.order_by).and_then(Value::as_f64);
        let right = b.fields.get(&query.order_by).and_then(Value::as_f64);
        match (left, right) {
            (Some(l), Some(r)) => {
                let ord = l.partial_cmp(&r).unwrap_or(Ordering::Equal);
                match query.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    Snapshot::new(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn recording_sink() -> (SnapshotSink, Arc<Mutex<Vec<SnapshotEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&events);
        let sink: SnapshotSink = Arc::new(move |event: SnapshotEvent| captured.lock().unwrap().push(event));
        (sink, events)
    }

    fn ids(event: &SnapshotEvent) -> Vec<String> {
        match event {
            SnapshotEvent::Snapshot(snapshot) => {
                snapshot.documents.iter().map(|d| d.id.clone()).collect()
            }
            SnapshotEvent::Error(err) => panic!("unexpected error event: {err}"),
        }
    }

    #[test]
    fn subscribe_pushes_initial_snapshot_newest_first() {
        let collection = InMemoryCollection::new(CollectionKind::Departments);
        collection.put("old", fields(json!({ "createdAt": 1 })));
        collection.put("new", fields(json!({ "createdAt": 5 })));
        collection.put("undated", fields(json!({})));

        let (sink, events) = recording_sink();
        let _sub = collection
            .subscribe(&CollectionQuery::created_at_desc(), sink)
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(ids(&events[0]), ["new", "old", "undated"]);
    }

    #[test]
    fn writes_push_complete_snapshots() {
        let collection = InMemoryCollection::new(CollectionKind::Penalties);
        let (sink, events) = recording_sink();
        let _sub = collection
            .subscribe(&CollectionQuery::created_at_desc(), sink)
            .unwrap();

        let id = collection
            .create(fields(json!({ "createdAt": 10, "status": "PENDING" })))
            .unwrap();
        assert_eq!(id.len(), GENERATED_ID_LEN);

        collection
            .update(&id, fields(json!({ "status": "PAID" })))
            .unwrap();
        assert_eq!(
            collection.document(&id).unwrap().get("status"),
            Some(&json!("PAID"))
        );
        assert_eq!(
            collection.document(&id).unwrap().get("createdAt"),
            Some(&json!(10))
        );

        collection.delete(&id).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert!(ids(&events[3]).is_empty());
    }

    #[test]
    fn concurrent_writes_arrive_in_write_order() {
        let collection = InMemoryCollection::new(CollectionKind::Penalties);
        let (sink, events) = recording_sink();
        let _sub = collection
            .subscribe(&CollectionQuery::created_at_desc(), sink)
            .unwrap();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let collection = collection.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        collection.put(format!("p-{w}-{i}"), fields(json!({ "createdAt": i })));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let sizes: Vec<usize> = events.lock().unwrap().iter().map(|e| ids(e).len()).collect();
        assert_eq!(sizes.len(), 201);
        assert!(sizes.windows(2).all(|pair| pair[0] + 1 == pair[1]));
    }

    #[test]
    fn sink_may_write_back_into_its_collection() {
        let collection = InMemoryCollection::new(CollectionKind::Departments);
        let events = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&events);
        let writer = collection.clone();
        let sink: SnapshotSink = Arc::new(move |event: SnapshotEvent| {
            let count = ids(&event).len();
            captured.lock().unwrap().push(count);
            if count == 1 {
                writer.put("echo", fields(json!({ "createdAt": 0 })));
            }
        });
        let _sub = collection
            .subscribe(&CollectionQuery::created_at_desc(), sink)
            .unwrap();

        collection.put("d1", fields(json!({ "createdAt": 1 })));

        assert_eq!(*events.lock().unwrap(), [0, 1, 2]);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn update_of_missing_document_is_not_found() {
        let collection = InMemoryCollection::new(CollectionKind::Employees);
        let err = collection
            .update("ghost", fields(json!({ "name": "x" })))
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound { .. }));
    }

    #[test]
    fn cancelled_subscription_stops_receiving() {
        let collection = InMemoryCollection::new(CollectionKind::Employees);
        let (sink, events) = recording_sink();
        let sub = collection
            .subscribe(&CollectionQuery::created_at_desc(), sink)
            .unwrap();
        assert_eq!(collection.subscriber_count(), 1);

        sub.cancel();
        assert_eq!(collection.subscriber_count(), 0);

        collection.put("e1", fields(json!({ "createdAt": 1 })));
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn injected_failures_surface() {
        let collection = InMemoryCollection::new(CollectionKind::Employees);
        collection.set_write_failure(Some(RemoteError::PermissionDenied("read-only".into())));
        assert!(matches!(
            collection.create(Map::new()),
            Err(RemoteError::PermissionDenied(_))
        ));
        assert!(collection.is_empty());

        collection.set_subscribe_failure(Some(RemoteError::Unavailable("offline".into())));
        let (sink, _) = recording_sink();
        assert!(
            collection
                .subscribe(&CollectionQuery::created_at_desc(), sink)
                .is_err()
        );
    }
}
