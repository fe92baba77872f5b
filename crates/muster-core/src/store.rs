//! Live read model over the four tracked collections.
//!
//! [`SyncStore`] owns one subscription per [`CollectionKind`]. Each pushed
//! snapshot is normalized and swapped in as a whole for its kind; the other
//! kinds are untouched. Consumers take a [`ReadModel`] with
//! [`SyncStore::snapshot`], which is a cheap point-in-time view that never
//! changes underneath them.
//!
//! Failures never clear data. A dropped subscription or a rejected snapshot
//! marks the kind [`SliceStatus::Stale`], queues a [`SyncFailure`] and keeps
//! serving the last good slice.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard, Weak};

use crate::error::ErrorCode;
use crate::model::{DepartmentFields, DesignationFields, EmployeeFields, Penalty, PenaltyFields};
use crate::normalize::{NormalizeError, Normalized, normalize};
use crate::remote::{
    CollectionKind, CollectionQuery, CollectionSet, RemoteCollection, RemoteError, Snapshot,
    SnapshotEvent, SnapshotSink, Subscription,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a kind stopped receiving fresh data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("subscription failed: {0}")]
    Subscription(#[from] RemoteError),
    #[error("snapshot rejected: {0}")]
    Rejected(#[from] NormalizeError),
}

impl SyncError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Subscription(_) => ErrorCode::SubscriptionFailed,
            Self::Rejected(_) => ErrorCode::SnapshotRejected,
        }
    }
}

/// A non-fatal failure for one collection kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {error}")]
pub struct SyncFailure {
    pub kind: CollectionKind,
    #[source]
    pub error: SyncError,
}

/// Result of resolving an id reference against the read model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("{kind} reference is not set")]
    Unset { kind: CollectionKind },
    #[error("{kind} '{id}' does not exist")]
    Dangling { kind: CollectionKind, id: String },
    #[error("{kind} '{id}' not found")]
    NotFound { kind: CollectionKind, id: String },
}

impl LookupError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unset { .. } | Self::Dangling { .. } => ErrorCode::DanglingReference,
            Self::NotFound { .. } => ErrorCode::RecordNotFound,
        }
    }
}

// ---------------------------------------------------------------------------
// Read model
// ---------------------------------------------------------------------------

/// One kind's current data and how many snapshots have been applied to it.
#[derive(Debug)]
pub struct Slice<F> {
    data: Arc<Normalized<F>>,
    revision: u64,
}

impl<F> Clone for Slice<F> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            revision: self.revision,
        }
    }
}

impl<F> Default for Slice<F> {
    fn default() -> Self {
        Self {
            data: Arc::new(Normalized::default()),
            revision: 0,
        }
    }
}

impl<F> Slice<F> {
    /// A slice holding `data` as if one snapshot had been applied.
    #[must_use]
    pub fn from_data(data: Normalized<F>) -> Self {
        Self {
            data: Arc::new(data),
            revision: 1,
        }
    }

    #[must_use]
    pub fn data(&self) -> &Normalized<F> {
        &self.data
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether two slices share the same underlying data.
    #[must_use]
    pub fn same_data(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    fn replace(&mut self, data: Normalized<F>) -> u64 {
        self.data = Arc::new(data);
        self.revision += 1;
        self.revision
    }
}

/// Point-in-time view of every tracked collection.
#[derive(Debug, Clone, Default)]
pub struct ReadModel {
    pub employees: Slice<EmployeeFields>,
    pub departments: Slice<DepartmentFields>,
    pub designations: Slice<DesignationFields>,
    pub penalties: Slice<PenaltyFields>,
}

/// An employee with its reference chain resolved as far as it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeView<'a> {
    pub id: &'a str,
    pub employee: &'a EmployeeFields,
    pub designation: Result<&'a DesignationFields, LookupError>,
    pub department: Result<&'a DepartmentFields, LookupError>,
}

impl EmployeeView<'_> {
    #[must_use]
    pub fn designation_name(&self) -> Option<&str> {
        self.designation
            .as_ref()
            .ok()
            .and_then(|d| d.designation_name.as_deref())
    }

    #[must_use]
    pub fn department_name(&self) -> Option<&str> {
        self.department
            .as_ref()
            .ok()
            .and_then(|d| d.department_name.as_deref())
    }

    #[must_use]
    pub const fn is_dangling(&self) -> bool {
        matches!(self.designation, Err(LookupError::Dangling { .. }))
            || matches!(self.department, Err(LookupError::Dangling { .. }))
    }
}

impl ReadModel {
    #[must_use]
    pub const fn revision(&self, kind: CollectionKind) -> u64 {
        match kind {
            CollectionKind::Employees => self.employees.revision,
            CollectionKind::Departments => self.departments.revision,
            CollectionKind::Designations => self.designations.revision,
            CollectionKind::Penalties => self.penalties.revision,
        }
    }

    /// Number of records currently held for `kind`.
    #[must_use]
    pub fn len(&self, kind: CollectionKind) -> usize {
        match kind {
            CollectionKind::Employees => self.employees.data.len(),
            CollectionKind::Departments => self.departments.data.len(),
            CollectionKind::Designations => self.designations.data.len(),
            CollectionKind::Penalties => self.penalties.data.len(),
        }
    }

    /// Penalties in server order, as fed to filtering and aggregation.
    #[must_use]
    pub fn penalty_list(&self) -> &[Penalty] {
        self.penalties.data.list()
    }

    #[must_use]
    pub fn employee(&self, id: &str) -> Option<&EmployeeFields> {
        self.employees.data.get(id)
    }

    #[must_use]
    pub fn department(&self, id: &str) -> Option<&DepartmentFields> {
        self.departments.data.get(id)
    }

    #[must_use]
    pub fn designation(&self, id: &str) -> Option<&DesignationFields> {
        self.designations.data.get(id)
    }

    #[must_use]
    pub fn penalty(&self, id: &str) -> Option<&PenaltyFields> {
        self.penalties.data.get(id)
    }

    /// Follow an employee's `designation_id`.
    ///
    /// # Errors
    ///
    /// [`LookupError::Unset`] when the employee has no designation id,
    /// [`LookupError::Dangling`] when the id has no designation behind it.
    pub fn designation_of(
        &self,
        employee: &EmployeeFields,
    ) -> Result<&DesignationFields, LookupError> {
        resolve(
            CollectionKind::Designations,
            employee.designation_id.as_deref(),
            |id| self.designation(id),
        )
    }

    /// Follow a designation's `department_id`.
    ///
    /// # Errors
    ///
    /// [`LookupError::Unset`] or [`LookupError::Dangling`], as for
    /// [`ReadModel::designation_of`].
    pub fn department_of(
        &self,
        designation: &DesignationFields,
    ) -> Result<&DepartmentFields, LookupError> {
        resolve(
            CollectionKind::Departments,
            designation.department_id.as_deref(),
            |id| self.department(id),
        )
    }

    /// Resolve employee -> designation -> department for one employee.
    ///
    /// Broken links are reported inside the view; only a missing employee
    /// is an error.
    ///
    /// # Errors
    ///
    /// [`LookupError::NotFound`] when no employee has this id.
    pub fn resolve_employee(&self, id: &str) -> Result<EmployeeView<'_>, LookupError> {
        let (id, employee) = self
            .employees
            .data
            .map()
            .get_key_value(id)
            .ok_or_else(|| LookupError::NotFound {
                kind: CollectionKind::Employees,
                id: id.to_string(),
            })?;
        Ok(self.view_of(id, employee))
    }

    /// Every employee in server order with references resolved.
    #[must_use]
    pub fn employee_views(&self) -> Vec<EmployeeView<'_>> {
        self.employees
            .data
            .list()
            .iter()
            .map(|record| self.view_of(&record.id, &record.fields))
            .collect()
    }

    fn view_of<'a>(&'a self, id: &'a str, employee: &'a EmployeeFields) -> EmployeeView<'a> {
        let designation = self.designation_of(employee);
        let department = designation
            .clone()
            .and_then(|designation| self.department_of(designation));
        let view = EmployeeView {
            id,
            employee,
            designation,
            department,
        };
        if view.is_dangling() {
            tracing::warn!(employee = id, "employee has a dangling reference");
        }
        view
    }

    fn install(&mut self, replacement: Replacement) -> (CollectionKind, u64) {
        match replacement {
            Replacement::Employees(data) => {
                (CollectionKind::Employees, self.employees.replace(data))
            }
            Replacement::Departments(data) => {
                (CollectionKind::Departments, self.departments.replace(data))
            }
            Replacement::Designations(data) => {
                (CollectionKind::Designations, self.designations.replace(data))
            }
            Replacement::Penalties(data) => {
                (CollectionKind::Penalties, self.penalties.replace(data))
            }
        }
    }
}

fn resolve<'a, T>(
    kind: CollectionKind,
    id: Option<&str>,
    lookup: impl FnOnce(&str) -> Option<&'a T>,
) -> Result<&'a T, LookupError> {
    let id = match id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(LookupError::Unset { kind }),
    };
    lookup(id).ok_or_else(|| LookupError::Dangling {
        kind,
        id: id.to_string(),
    })
}

enum Replacement {
    Employees(Normalized<EmployeeFields>),
    Departments(Normalized<DepartmentFields>),
    Designations(Normalized<DesignationFields>),
    Penalties(Normalized<PenaltyFields>),
}

impl Replacement {
    fn decode(kind: CollectionKind, snapshot: &Snapshot) -> Result<Self, NormalizeError> {
        Ok(match kind {
            CollectionKind::Employees => Self::Employees(normalize(snapshot)?),
            CollectionKind::Departments => Self::Departments(normalize(snapshot)?),
            CollectionKind::Designations => Self::Designations(normalize(snapshot)?),
            CollectionKind::Penalties => Self::Penalties(normalize(snapshot)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Freshness of one kind's slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceStatus {
    /// No snapshot or failure seen yet.
    Pending,
    /// The latest event was an applied snapshot.
    Live,
    /// The latest event was a failure; the last good data is still served.
    Stale,
}

impl SliceStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Live => "live",
            Self::Stale => "stale",
        }
    }
}

impl fmt::Display for SliceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change notification delivered to watchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Replaced {
        kind: CollectionKind,
        revision: u64,
    },
    Failed(SyncFailure),
}

/// Handle returned by [`SyncStore::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(u64);

type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

struct State {
    model: ReadModel,
    status: BTreeMap<CollectionKind, SliceStatus>,
    closed: bool,
}

#[derive(Default)]
struct Listeners {
    next: u64,
    entries: BTreeMap<u64, Listener>,
}

struct Shared {
    state: RwLock<State>,
    /// Held across decode and install so one kind's events land in arrival order.
    apply_gates: BTreeMap<CollectionKind, Mutex<()>>,
    listeners: Mutex<Listeners>,
    failures: Mutex<Vec<SyncFailure>>,
}

impl Shared {
    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, kind: CollectionKind, event: SnapshotEvent) {
        if let Some(event) = self.absorb(kind, event) {
            self.notify(&event);
        }
    }

    fn absorb(&self, kind: CollectionKind, event: SnapshotEvent) -> Option<StoreEvent> {
        let gate = self.apply_gates.get(&kind).map(lock);
        let outcome = match event {
            SnapshotEvent::Snapshot(snapshot) => Replacement::decode(kind, &snapshot)
                .map(|replacement| (replacement, snapshot.len()))
                .map_err(SyncError::from),
            SnapshotEvent::Error(err) => Err(SyncError::from(err)),
        };

        let mut state = self.write_state();
        if state.closed {
            drop(state);
            tracing::warn!(%kind, "dropping event that arrived after close");
            return None;
        }
        let event = match outcome {
            Ok((replacement, records)) => {
                let (kind, revision) = state.model.install(replacement);
                state.status.insert(kind, SliceStatus::Live);
                tracing::debug!(%kind, records, revision, "applied snapshot");
                StoreEvent::Replaced { kind, revision }
            }
            Err(error) => {
                state.status.insert(kind, SliceStatus::Stale);
                let failure = SyncFailure { kind, error };
                tracing::warn!(
                    %kind,
                    code = %failure.error.code(),
                    error = %failure.error,
                    "keeping last known snapshot"
                );
                lock(&self.failures).push(failure.clone());
                StoreEvent::Failed(failure)
            }
        };
        drop(state);
        drop(gate);
        Some(event)
    }

    fn notify(&self, event: &StoreEvent) {
        let listeners: Vec<Listener> = lock(&self.listeners).entries.values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }
}

/// Explicitly owned live mirror of the remote collections.
///
/// Dropping the store closes it.
pub struct SyncStore {
    shared: Arc<Shared>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl SyncStore {
    /// Subscribe to every collection in `collections`, newest first.
    ///
    /// A subscription that cannot be established is queued as a
    /// [`SyncFailure`] for its kind; the rest of the store still opens.
    #[must_use]
    pub fn open(collections: &CollectionSet) -> Self {
        tracing::info!("opening sync store");
        let shared = Arc::new(Shared {
            state: RwLock::new(State {
                model: ReadModel::default(),
                status: CollectionKind::ALL
                    .iter()
                    .map(|kind| (*kind, SliceStatus::Pending))
                    .collect(),
                closed: false,
            }),
            apply_gates: CollectionKind::ALL
                .iter()
                .map(|kind| (*kind, Mutex::new(())))
                .collect(),
            listeners: Mutex::new(Listeners::default()),
            failures: Mutex::new(Vec::new()),
        });

        let query = CollectionQuery::created_at_desc();
        let mut subscriptions = Vec::with_capacity(CollectionKind::ALL.len());
        for kind in CollectionKind::ALL {
            let weak: Weak<Shared> = Arc::downgrade(&shared);
            let sink: SnapshotSink = Arc::new(move |event: SnapshotEvent| {
                if let Some(shared) = weak.upgrade() {
                    shared.apply(kind, event);
                }
            });
            match collections.get(kind).subscribe(&query, sink) {
                Ok(subscription) => subscriptions.push(subscription),
                Err(err) => shared.apply(kind, SnapshotEvent::Error(err)),
            }
        }

        Self {
            shared,
            subscriptions: Mutex::new(subscriptions),
        }
    }

    /// Current point-in-time view of every kind.
    #[must_use]
    pub fn snapshot(&self) -> ReadModel {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .model
            .clone()
    }

    #[must_use]
    pub fn status(&self, kind: CollectionKind) -> SliceStatus {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
            .get(&kind)
            .copied()
            .unwrap_or(SliceStatus::Pending)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    /// Take every failure queued since the last call.
    pub fn drain_failures(&self) -> Vec<SyncFailure> {
        std::mem::take(&mut *lock(&self.shared.failures))
    }

    /// Register a listener for replacements and failures.
    ///
    /// Listeners run on whichever thread delivered the event, after the
    /// state lock is released, so they may call back into the store.
    pub fn watch(&self, listener: impl Fn(&StoreEvent) + Send + Sync + 'static) -> WatchId {
        let mut listeners = lock(&self.shared.listeners);
        let id = listeners.next;
        listeners.next += 1;
        listeners.entries.insert(id, Arc::new(listener));
        WatchId(id)
    }

    /// Returns `false` if the listener was already removed.
    pub fn unwatch(&self, id: WatchId) -> bool {
        lock(&self.shared.listeners).entries.remove(&id.0).is_some()
    }

    /// Stop applying events and cancel all four subscriptions together.
    ///
    /// Idempotent. Events delivered afterwards are dropped.
    pub fn close(&self) {
        {
            let mut state = self.shared.write_state();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        let subscriptions = std::mem::take(&mut *lock(&self.subscriptions));
        let cancelled = subscriptions.len();
        for subscription in subscriptions {
            subscription.cancel();
        }
        tracing::info!(cancelled, "sync store closed");
    }
}

impl Drop for SyncStore {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SyncStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self
            .shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("SyncStore")
            .field("status", &state.status)
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCollection;
    use crate::model::PenaltyStatus;
    use serde_json::{Map, Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    struct Fixture {
        employees: InMemoryCollection,
        departments: InMemoryCollection,
        designations: InMemoryCollection,
        penalties: InMemoryCollection,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                employees: InMemoryCollection::new(CollectionKind::Employees),
                departments: InMemoryCollection::new(CollectionKind::Departments),
                designations: InMemoryCollection::new(CollectionKind::Designations),
                penalties: InMemoryCollection::new(CollectionKind::Penalties),
            }
        }

        fn set(&self) -> CollectionSet {
            CollectionSet {
                employees: Arc::new(self.employees.clone()),
                departments: Arc::new(self.departments.clone()),
                designations: Arc::new(self.designations.clone()),
                penalties: Arc::new(self.penalties.clone()),
            }
        }
    }

    #[test]
    fn open_applies_initial_snapshots() {
        let fx = Fixture::new();
        fx.penalties
            .put("p1", fields(json!({ "status": "PENDING", "amount": 10 })));

        let store = SyncStore::open(&fx.set());
        let model = store.snapshot();

        assert_eq!(model.len(CollectionKind::Penalties), 1);
        assert_eq!(model.revision(CollectionKind::Penalties), 1);
        assert_eq!(
            model.penalty("p1").unwrap().status,
            Some(PenaltyStatus::Pending)
        );
        for kind in CollectionKind::ALL {
            assert_eq!(store.status(kind), SliceStatus::Live);
        }
    }

    #[test]
    fn snapshot_replaces_only_its_kind() {
        let fx = Fixture::new();
        fx.departments
            .put("d1", fields(json!({ "department_name": "QA" })));
        let store = SyncStore::open(&fx.set());
        let before = store.snapshot();

        fx.penalties.put("p1", fields(json!({ "amount": 5 })));
        let after = store.snapshot();

        assert_eq!(after.revision(CollectionKind::Penalties), 2);
        assert!(after.departments.same_data(&before.departments));
        assert_eq!(after.revision(CollectionKind::Departments), 1);
        assert_eq!(before.len(CollectionKind::Penalties), 0);
    }

    #[test]
    fn rejected_snapshot_keeps_previous_slice() {
        let fx = Fixture::new();
        fx.penalties.put("p1", fields(json!({ "amount": 5 })));
        let store = SyncStore::open(&fx.set());

        fx.penalties
            .put("p2", fields(json!({ "amount": [1, 2] })));

        let model = store.snapshot();
        assert_eq!(model.len(CollectionKind::Penalties), 1);
        assert_eq!(store.status(CollectionKind::Penalties), SliceStatus::Stale);

        let failures = store.drain_failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0].error,
            SyncError::Rejected(NormalizeError { id, .. }) if id == "p2"
        ));
        assert!(store.drain_failures().is_empty());
    }

    #[test]
    fn failed_subscribe_is_reported_not_fatal() {
        let fx = Fixture::new();
        fx.designations
            .set_subscribe_failure(Some(RemoteError::Unavailable("offline".into())));

        let store = SyncStore::open(&fx.set());

        assert_eq!(store.status(CollectionKind::Designations), SliceStatus::Stale);
        assert_eq!(store.status(CollectionKind::Employees), SliceStatus::Live);
        let failures = store.drain_failures();
        assert_eq!(failures[0].kind, CollectionKind::Designations);
        assert_eq!(failures[0].error.code(), ErrorCode::SubscriptionFailed);
    }

    #[test]
    fn watchers_see_replacements_and_failures() {
        let fx = Fixture::new();
        let store = SyncStore::open(&fx.set());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = store.watch(move |event| sink.lock().unwrap().push(event.clone()));

        fx.employees.put("e1", fields(json!({ "name": "Ada L" })));
        fx.employees
            .fail_subscribers(&RemoteError::Unavailable("reset".into()));
        assert!(store.unwatch(id));
        assert!(!store.unwatch(id));
        fx.employees.put("e2", fields(json!({ "name": "Bob B" })));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0],
            StoreEvent::Replaced {
                kind: CollectionKind::Employees,
                revision: 2
            }
        );
        assert!(matches!(&seen[1], StoreEvent::Failed(f) if f.kind == CollectionKind::Employees));
    }

    #[test]
    fn close_cancels_all_subscriptions() {
        let fx = Fixture::new();
        let store = SyncStore::open(&fx.set());
        assert_eq!(fx.penalties.subscriber_count(), 1);

        store.close();
        store.close();

        assert!(store.is_closed());
        for collection in [&fx.employees, &fx.departments, &fx.designations, &fx.penalties] {
            assert_eq!(collection.subscriber_count(), 0);
        }
        fx.penalties.put("p1", fields(json!({})));
        assert_eq!(store.snapshot().len(CollectionKind::Penalties), 0);
    }

    #[test]
    fn drop_closes_store() {
        let fx = Fixture::new();
        {
            let _store = SyncStore::open(&fx.set());
            assert_eq!(fx.employees.subscriber_count(), 1);
        }
        assert_eq!(fx.employees.subscriber_count(), 0);
    }

    /// Hands its sink to the test so events can be pushed after cancel.
    struct CapturingCollection {
        kind: CollectionKind,
        sink: Mutex<Option<SnapshotSink>>,
        cancels: Arc<AtomicUsize>,
    }

    impl RemoteCollection for CapturingCollection {
        fn kind(&self) -> CollectionKind {
            self.kind
        }

        fn subscribe(
            &self,
            _query: &CollectionQuery,
            sink: SnapshotSink,
        ) -> Result<Subscription, RemoteError> {
            *self.sink.lock().unwrap() = Some(sink);
            let cancels = Arc::clone(&self.cancels);
            Ok(Subscription::new(move || {
                cancels.fetch_add(1, Ordering::SeqCst);
            }))
        }

        fn create(&self, _fields: Map<String, Value>) -> Result<String, RemoteError> {
            Err(RemoteError::Rejected("read-only".into()))
        }

        fn update(&self, _id: &str, _partial: Map<String, Value>) -> Result<(), RemoteError> {
            Err(RemoteError::Rejected("read-only".into()))
        }

        fn delete(&self, _id: &str) -> Result<(), RemoteError> {
            Err(RemoteError::Rejected("read-only".into()))
        }
    }

    #[test]
    fn late_events_after_close_are_dropped() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let capturing = |kind| {
            Arc::new(CapturingCollection {
                kind,
                sink: Mutex::new(None),
                cancels: Arc::clone(&cancels),
            })
        };
        let penalties = capturing(CollectionKind::Penalties);
        let set = CollectionSet {
            employees: capturing(CollectionKind::Employees),
            departments: capturing(CollectionKind::Departments),
            designations: capturing(CollectionKind::Designations),
            penalties: Arc::clone(&penalties) as Arc<dyn RemoteCollection>,
        };

        let store = SyncStore::open(&set);
        let sink = penalties.sink.lock().unwrap().clone().unwrap();
        store.close();
        assert_eq!(cancels.load(Ordering::SeqCst), 4);

        let late = Snapshot::new(vec![crate::remote::RawDocument::new(
            "p1",
            fields(json!({ "amount": 1 })),
        )]);
        sink(SnapshotEvent::Snapshot(late));
        sink(SnapshotEvent::Error(RemoteError::Unavailable("gone".into())));

        assert_eq!(store.snapshot().revision(CollectionKind::Penalties), 0);
        assert_eq!(store.status(CollectionKind::Penalties), SliceStatus::Pending);
        assert!(store.drain_failures().is_empty());
    }

    #[test]
    fn dangling_references_resolve_to_errors() {
        let fx = Fixture::new();
        fx.departments
            .put("d1", fields(json!({ "department_name": "DevSecOps" })));
        fx.designations.put(
            "g1",
            fields(json!({ "designation_name": "Engineer", "department_id": "d1" })),
        );
        fx.designations.put(
            "g2",
            fields(json!({ "designation_name": "Orphan", "department_id": "gone" })),
        );
        fx.employees
            .put("e1", fields(json!({ "name": "Ada L", "designation_id": "g1" })));
        fx.employees
            .put("e2", fields(json!({ "name": "Bob B", "designation_id": "missing" })));
        fx.employees
            .put("e3", fields(json!({ "name": "Cy D", "designation_id": "g2" })));
        fx.employees.put("e4", fields(json!({ "name": "Di E" })));

        let store = SyncStore::open(&fx.set());
        let model = store.snapshot();

        let ok = model.resolve_employee("e1").unwrap();
        assert_eq!(ok.designation_name(), Some("Engineer"));
        assert_eq!(ok.department_name(), Some("DevSecOps"));
        assert!(!ok.is_dangling());

        let missing = model.resolve_employee("e2").unwrap();
        assert_eq!(
            missing.designation,
            Err(LookupError::Dangling {
                kind: CollectionKind::Designations,
                id: "missing".into()
            })
        );
        assert!(missing.is_dangling());
        assert_eq!(missing.department_name(), None);

        let orphan = model.resolve_employee("e3").unwrap();
        assert_eq!(orphan.designation_name(), Some("Orphan"));
        assert!(matches!(
            orphan.department,
            Err(LookupError::Dangling { kind: CollectionKind::Departments, .. })
        ));

        let unset = model.resolve_employee("e4").unwrap();
        assert!(matches!(unset.designation, Err(LookupError::Unset { .. })));
        assert!(!unset.is_dangling());

        assert!(matches!(
            model.resolve_employee("nobody"),
            Err(LookupError::NotFound { .. })
        ));
        assert_eq!(model.employee_views().len(), 4);
    }
}
