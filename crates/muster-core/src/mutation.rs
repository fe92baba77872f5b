//! Shared pieces of the write paths.
//!
//! Writes go straight to the remote store and are never retried. Local
//! state is not touched; the change shows up once the subscription pushes
//! the next snapshot.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::AuthError;
use crate::error::ErrorCode;
use crate::model::InvalidTransition;
use crate::model::record::{CREATED_AT_FIELD, MODIFIED_AT_FIELD};
use crate::remote::RemoteError;
use crate::store::LookupError;

/// Input rejected before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("could not encode document: {0}")]
    Encode(String),
}

impl MutationError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Auth(err) => err.code(),
            Self::Validation(_) => ErrorCode::InvalidInput,
            Self::Transition(_) => ErrorCode::InvalidStateTransition,
            Self::Lookup(err) => err.code(),
            Self::Remote(err) => err.code(),
            Self::Encode(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Bookkeeping a write adds to the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    /// `createdAt` and `modifiedAt`.
    Created(i64),
    /// `modifiedAt` only.
    Modified(i64),
}

/// Encode `payload` as a document field map and apply `stamp`.
///
/// # Errors
///
/// [`MutationError::Encode`] when the payload is not a JSON object.
pub fn document_fields<T: Serialize>(payload: &T, stamp: Stamp) -> Result<Map<String, Value>, MutationError> {
    let mut fields = match serde_json::to_value(payload) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => return Err(MutationError::Encode(format!("expected an object, got {other}"))),
        Err(err) => return Err(MutationError::Encode(err.to_string())),
    };
    match stamp {
        Stamp::Created(at) => {
            fields.insert(CREATED_AT_FIELD.to_string(), Value::from(at));
            fields.insert(MODIFIED_AT_FIELD.to_string(), Value::from(at));
        }
        Stamp::Modified(at) => {
            fields.remove(CREATED_AT_FIELD);
            fields.insert(MODIFIED_AT_FIELD.to_string(), Value::from(at));
        }
    }
    Ok(fields)
}

/// Trimmed value of a required text field.
///
/// # Errors
///
/// Fails when `value` is blank.
pub fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::new(field, "is required"))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DepartmentFields;
    use serde_json::json;

    #[test]
    fn created_stamp_sets_both_timestamps() {
        let fields = document_fields(&DepartmentFields::new("QA"), Stamp::Created(42)).unwrap();
        assert_eq!(
            Value::Object(fields),
            json!({ "department_name": "QA", "createdAt": 42, "modifiedAt": 42 })
        );
    }

    #[test]
    fn modified_stamp_never_writes_created_at() {
        let mut payload = DepartmentFields::new("QA");
        payload.extra.insert("createdAt".into(), json!(1));
        let fields = document_fields(&payload, Stamp::Modified(7)).unwrap();
        assert!(!fields.contains_key("createdAt"));
        assert_eq!(fields.get("modifiedAt"), Some(&json!(7)));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = document_fields(&"plain", Stamp::Modified(1)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalUnexpected);
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("name", "  Ada ").unwrap(), "Ada");
        assert_eq!(
            required("name", "   ").unwrap_err().to_string(),
            "name: is required"
        );
    }

    #[test]
    fn codes_follow_the_wrapped_error() {
        let err = MutationError::from(AuthError::Unauthenticated);
        assert_eq!(err.code(), ErrorCode::Unauthenticated);
        let err = MutationError::from(RemoteError::PermissionDenied("rules".into()));
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }
}
