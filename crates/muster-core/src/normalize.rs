//! Snapshot normalization.
//!
//! Turns one pushed [`Snapshot`] into an ordered list of typed records plus
//! an id-keyed map of payloads. The map drops the bookkeeping fields (`id`,
//! `createdAt`, `modifiedAt`); the list keeps them.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::error::ErrorCode;
use crate::model::record::{ID_FIELD, Record};
use crate::remote::Snapshot;

/// A document had a present field of the wrong JSON type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("document '{id}' is malformed: {reason}")]
pub struct NormalizeError {
    pub id: String,
    pub reason: String,
}

impl NormalizeError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::SnapshotRejected
    }
}

/// One normalized collection: server order plus id index.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<F> {
    list: Vec<Record<F>>,
    map: BTreeMap<String, F>,
}

impl<F> Default for Normalized<F> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            map: BTreeMap::new(),
        }
    }
}

impl<F> Normalized<F> {
    /// Records in the order the store delivered them.
    #[must_use]
    pub fn list(&self) -> &[Record<F>] {
        &self.list
    }

    /// Payloads keyed by id.
    #[must_use]
    pub const fn map(&self) -> &BTreeMap<String, F> {
        &self.map
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&F> {
        self.map.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Decode every document of `snapshot` as a `Record<F>`.
///
/// Missing fields decode as absent. A field that is present with the wrong
/// type rejects the whole snapshot. When an id repeats, the list keeps every
/// entry and the map keeps the first.
///
/// # Errors
///
/// Returns [`NormalizeError`] naming the first document that fails to decode.
pub fn normalize<F>(snapshot: &Snapshot) -> Result<Normalized<F>, NormalizeError>
where
    F: DeserializeOwned + Clone,
{
    let mut list = Vec::with_capacity(snapshot.len());
    let mut map = BTreeMap::new();

    for doc in &snapshot.documents {
        let mut fields = doc.fields.clone();
        fields.insert(ID_FIELD.to_string(), Value::String(doc.id.clone()));

        let record: Record<F> =
            serde_json::from_value(Value::Object(fields)).map_err(|e| NormalizeError {
                id: doc.id.clone(),
                reason: e.to_string(),
            })?;

        match map.entry(record.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record.fields.clone());
            }
            Entry::Occupied(_) => {
                tracing::warn!(id = %record.id, "duplicate document id in snapshot; keeping first");
            }
        }
        list.push(record);
    }

    Ok(Normalized { list, map })
}
