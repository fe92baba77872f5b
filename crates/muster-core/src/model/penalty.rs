use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

use super::amount::Amount;
use super::record::Record;

/// Lifecycle of a penalty.
///
/// `Pending` is assigned at creation. `Paid` and `Disputed` are terminal in
/// the recommended flow, but the remote store accepts any status write; see
/// [`crate::workflow::TransitionPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PenaltyStatus {
    Pending,
    Paid,
    Disputed,
}

impl PenaltyStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Paid, Self::Disputed];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Disputed => "DISPUTED",
        }
    }

    /// Validate whether a transition from self to `target` is recommended.
    ///
    /// Recommended transitions:
    /// - `PENDING -> PAID`
    /// - `PENDING -> DISPUTED`
    pub fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        if self == target {
            return Err(InvalidTransition {
                from: self,
                to: target,
                reason: "no-op transition is not allowed",
            });
        }

        if matches!(
            (self, target),
            (Self::Pending, Self::Paid) | (Self::Pending, Self::Disputed)
        ) {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self,
                to: target,
                reason: "status is terminal",
            })
        }
    }

    /// Targets a presentation layer should offer for a penalty in this state.
    #[must_use]
    pub fn available_transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Disputed, Self::Paid],
            Self::Paid | Self::Disputed => &[],
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for PenaltyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected}: '{got}'")]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl FromStr for PenaltyStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "DISPUTED" => Ok(Self::Disputed),
            _ => Err(ParseEnumError {
                expected: "penalty status",
                got: s.to_string(),
            }),
        }
    }
}

/// Error returned when a status transition is outside the recommended flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move penalty from {from} to {to}: {reason}")]
pub struct InvalidTransition {
    pub from: PenaltyStatus,
    pub to: PenaltyStatus,
    pub reason: &'static str,
}

/// Penalty payload. `department` is free text, not a department id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engineer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    /// Calendar date as `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<PenaltyStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type Penalty = Record<PenaltyFields>;

impl PenaltyFields {
    #[must_use]
    pub fn engineer_name(&self) -> &str {
        self.engineer_name.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn department(&self) -> &str {
        self.department.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn amount(&self) -> Amount {
        self.amount.unwrap_or_default()
    }

    #[must_use]
    pub fn date(&self) -> &str {
        self.date.as_deref().unwrap_or_default()
    }
}

/// Unknown status strings decode as "not set" rather than failing the whole
/// document.
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<PenaltyStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|text| {
        text.parse().map_or_else(
            |_| {
                tracing::debug!(status = %text, "ignoring unknown penalty status");
                None
            },
            Some,
        )
    }))
}
