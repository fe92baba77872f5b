//! Penalty status changes and penalty creation.
//!
//! The remote store accepts any status write. [`TransitionPolicy`] decides
//! whether this crate checks the recommended machine before writing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::auth::{AuthSession, require_user};
use crate::config::WorkflowConfig;
use crate::model::{Amount, PenaltyFields, PenaltyStatus};
use crate::mutation::{MutationError, Stamp, ValidationError, document_fields, now_ms, required};
use crate::query::parse_date;
use crate::remote::{CollectionKind, RemoteCollection};
use crate::store::{LookupError, ReadModel};

/// Whether status writes are checked against the read model first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Write whatever the caller asks for.
    #[default]
    Permissive,
    /// Only `PENDING -> PAID` and `PENDING -> DISPUTED`.
    Strict,
}

impl TransitionPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for a new penalty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPenalty {
    pub engineer_name: String,
    pub department: String,
    pub reason: String,
    pub amount: Amount,
    /// `YYYY-MM-DD`.
    pub date: String,
}

impl NewPenalty {
    /// Check every field and build the stored payload with `status = PENDING`.
    ///
    /// # Errors
    ///
    /// The first [`ValidationError`] found.
    pub fn validate(&self) -> Result<PenaltyFields, ValidationError> {
        let engineer_name = required("engineerName", &self.engineer_name)?;
        let department = required("department", &self.department)?;
        let reason = required("reason", &self.reason)?;
        if self.amount.is_negative() {
            return Err(ValidationError::new("amount", "must not be negative"));
        }
        let date = self.date.trim();
        if parse_date(date).is_err() {
            return Err(ValidationError::new("date", "must be a YYYY-MM-DD date"));
        }

        Ok(PenaltyFields {
            engineer_name: Some(engineer_name.to_string()),
            department: Some(department.to_string()),
            reason: Some(reason.to_string()),
            amount: Some(self.amount),
            date: Some(date.to_string()),
            status: Some(PenaltyStatus::Pending),
            extra: Map::new(),
        })
    }
}

/// Issues penalty writes on behalf of the signed-in user.
pub struct PenaltyWorkflow {
    penalties: Arc<dyn RemoteCollection>,
    auth: Arc<dyn AuthSession>,
    policy: TransitionPolicy,
}

impl PenaltyWorkflow {
    pub fn new(penalties: Arc<dyn RemoteCollection>, auth: Arc<dyn AuthSession>) -> Self {
        Self {
            penalties,
            auth,
            policy: TransitionPolicy::default(),
        }
    }

    /// Workflow using the `[workflow]` section of the resolved configuration.
    #[must_use]
    pub fn from_config(
        penalties: Arc<dyn RemoteCollection>,
        auth: Arc<dyn AuthSession>,
        config: &WorkflowConfig,
    ) -> Self {
        tracing::debug!(policy = ?config.policy, "penalty workflow configured");
        Self::new(penalties, auth).with_policy(config.policy)
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Write `status` to penalty `id`. Only the `status` field is sent.
    ///
    /// Returns once the write is accepted; the read model catches up when
    /// the next snapshot arrives. Under [`TransitionPolicy::Strict`] the
    /// current status is taken from `current`.
    ///
    /// # Errors
    ///
    /// - [`MutationError::Auth`] when nobody is signed in.
    /// - [`MutationError::Lookup`] / [`MutationError::Validation`] under the
    ///   strict policy when the penalty or its status is unknown.
    /// - [`MutationError::Transition`] under the strict policy for a
    ///   transition outside the recommended machine.
    /// - [`MutationError::Remote`] when the store rejects the write.
    pub fn set_status(
        &self,
        current: &ReadModel,
        id: &str,
        status: PenaltyStatus,
    ) -> Result<(), MutationError> {
        let user = require_user(self.auth.as_ref())?;

        if self.policy == TransitionPolicy::Strict {
            let penalty = current.penalty(id).ok_or_else(|| LookupError::NotFound {
                kind: CollectionKind::Penalties,
                id: id.to_string(),
            })?;
            let from = penalty
                .status
                .ok_or_else(|| ValidationError::new("status", "current status is not set"))?;
            from.can_transition_to(status)?;
        }

        let mut partial = Map::new();
        partial.insert(
            "status".to_string(),
            Value::String(status.as_str().to_string()),
        );
        self.penalties.update(id, partial)?;

        tracing::info!(
            penalty = id,
            %status,
            policy = %self.policy,
            user = %user.email,
            "penalty status write issued"
        );
        Ok(())
    }

    /// Validate and create a penalty; returns the new document id.
    ///
    /// # Errors
    ///
    /// [`MutationError::Auth`], [`MutationError::Validation`] or
    /// [`MutationError::Remote`].
    pub fn create_penalty(&self, penalty: &NewPenalty) -> Result<String, MutationError> {
        let user = require_user(self.auth.as_ref())?;
        let payload = penalty.validate()?;
        let fields = document_fields(&payload, Stamp::Created(now_ms()))?;
        let id = self.penalties.create(fields)?;
        tracing::info!(penalty = %id, user = %user.email, "penalty created");
        Ok(id)
    }
}

impl fmt::Debug for PenaltyWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PenaltyWorkflow")
            .field("collection", &self.penalties.kind())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
