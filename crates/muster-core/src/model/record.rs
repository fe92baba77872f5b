//! Generic document envelope shared by every tracked collection.

use serde::{Deserialize, Serialize};

/// Field names the remote store attaches to every document.
pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const MODIFIED_AT_FIELD: &str = "modifiedAt";

/// One document of a tracked collection.
///
/// `id`, `created_at` and `modified_at` are bookkeeping assigned by the
/// store; `fields` is the payload consumers care about. Timestamps are epoch
/// milliseconds and may be absent on documents written by older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<F> {
    pub id: String,
    #[serde(
        rename = "createdAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<i64>,
    #[serde(
        rename = "modifiedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub modified_at: Option<i64>,
    #[serde(flatten)]
    pub fields: F,
}

impl<F> Record<F> {
    pub fn new(id: impl Into<String>, fields: F) -> Self {
        Self {
            id: id.into(),
            created_at: None,
            modified_at: None,
            fields,
        }
    }

    #[must_use]
    pub const fn with_timestamps(mut self, created_at: i64, modified_at: i64) -> Self {
        self.created_at = Some(created_at);
        self.modified_at = Some(modified_at);
        self
    }
}
