//! Penalty filtering.
//!
//! A penalty is kept when all four predicates hold: free-text search,
//! department, status and an inclusive date range. Each predicate is a
//! public function so callers can check them independently. Filtering is
//! pure and keeps the input order.

use chrono::{Duration, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

use crate::config::FilterDefaults;
use crate::model::{ParseEnumError, Penalty, PenaltyFields, PenaltyStatus};

/// Wildcard accepted by the department and status filters.
pub const WILDCARD: &str = "ALL";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Department predicate: the wildcard or an exact, case-sensitive name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DepartmentFilter {
    #[default]
    All,
    Named(String),
}

impl DepartmentFilter {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => WILDCARD,
            Self::Named(name) => name,
        }
    }
}

impl From<&str> for DepartmentFilter {
    fn from(value: &str) -> Self {
        if value == WILDCARD {
            Self::All
        } else {
            Self::Named(value.to_string())
        }
    }
}

impl fmt::Display for DepartmentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status predicate: the wildcard or one exact status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(PenaltyStatus),
}

impl FromStr for StatusFilter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(WILDCARD) {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only).map_err(|_| ParseEnumError {
            expected: "status filter (PENDING, PAID, DISPUTED or ALL)",
            got: s.to_string(),
        })
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(WILDCARD),
            Self::Only(status) => fmt::Display::fmt(status, f),
        }
    }
}

/// Inclusive `YYYY-MM-DD` bounds. An empty bound is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    #[must_use]
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// No bounds at all.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// `[today - days, today]`.
    #[must_use]
    pub fn trailing_days(today: NaiveDate, days: u32) -> Self {
        let start = today - Duration::days(i64::from(days));
        Self::new(
            start.format(DATE_FORMAT).to_string(),
            today.format(DATE_FORMAT).to_string(),
        )
    }

    /// Lexicographic comparison; valid because ISO dates sort in calendar order.
    #[must_use]
    pub fn contains(&self, date: &str) -> bool {
        (self.start.is_empty() || date >= self.start.as_str())
            && (self.end.is_empty() || date <= self.end.as_str())
    }
}

/// Ephemeral per-session filter state for the penalty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilters {
    pub search: String,
    pub department: DepartmentFilter,
    pub status: StatusFilter,
    pub date_range: DateRange,
}

impl SearchFilters {
    /// Filters that keep everything.
    #[must_use]
    pub fn match_all() -> Self {
        Self {
            search: String::new(),
            department: DepartmentFilter::All,
            status: StatusFilter::All,
            date_range: DateRange::unbounded(),
        }
    }

    /// The state a fresh session starts with.
    ///
    /// An unparseable configured status falls back to the wildcard.
    #[must_use]
    pub fn session_default(defaults: &FilterDefaults, today: NaiveDate) -> Self {
        let status = defaults.default_status.parse().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "invalid default status; using ALL");
            StatusFilter::All
        });
        Self {
            search: String::new(),
            department: DepartmentFilter::from(defaults.default_department.as_str()),
            status,
            date_range: DateRange::trailing_days(today, defaults.trailing_days),
        }
    }

    /// Whether `penalty` passes all four predicates.
    #[must_use]
    pub fn matches(&self, penalty: &PenaltyFields) -> bool {
        matches_text(penalty, &self.search)
            && matches_department(penalty, &self.department)
            && matches_status(penalty, self.status)
            && matches_date_range(penalty, &self.date_range)
    }
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self::session_default(&FilterDefaults::default(), Utc::now().date_naive())
    }
}

/// Empty search, or a case-insensitive substring of engineer name or reason.
#[must_use]
pub fn matches_text(penalty: &PenaltyFields, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    penalty.engineer_name().to_lowercase().contains(&needle)
        || penalty.reason().to_lowercase().contains(&needle)
}

#[must_use]
pub fn matches_department(penalty: &PenaltyFields, department: &DepartmentFilter) -> bool {
    match department {
        DepartmentFilter::All => true,
        DepartmentFilter::Named(name) => penalty.department() == name,
    }
}

/// A penalty with no recognised status only passes the wildcard.
#[must_use]
pub fn matches_status(penalty: &PenaltyFields, status: StatusFilter) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::Only(wanted) => penalty.status == Some(wanted),
    }
}

#[must_use]
pub fn matches_date_range(penalty: &PenaltyFields, range: &DateRange) -> bool {
    range.contains(penalty.date())
}

/// Penalties passing `filters`, in input order.
#[must_use]
pub fn filter(penalties: &[Penalty], filters: &SearchFilters) -> Vec<Penalty> {
    penalties
        .iter()
        .filter(|penalty| filters.matches(&penalty.fields))
        .cloned()
        .collect()
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns the chrono parse error for anything else.
pub fn parse_date(text: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
}
