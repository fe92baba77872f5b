use std::fmt;

/// Machine-readable error codes shared by every muster error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    SubscriptionFailed,
    SnapshotRejected,
    RecordNotFound,
    DanglingReference,
    InvalidStateTransition,
    InvalidInput,
    Unauthenticated,
    InvalidCredentials,
    PermissionDenied,
    RemoteUnavailable,
    AuthProviderError,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::SubscriptionFailed => "E3001",
            Self::SnapshotRejected => "E3002",
            Self::RecordNotFound => "E2001",
            Self::DanglingReference => "E2003",
            Self::InvalidStateTransition => "E2002",
            Self::InvalidInput => "E2005",
            Self::Unauthenticated => "E4001",
            Self::InvalidCredentials => "E4002",
            Self::PermissionDenied => "E4003",
            Self::RemoteUnavailable => "E5001",
            Self::AuthProviderError => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::SubscriptionFailed => "Live subscription failed",
            Self::SnapshotRejected => "Snapshot rejected",
            Self::RecordNotFound => "Record not found",
            Self::DanglingReference => "Reference points at a missing record",
            Self::InvalidStateTransition => "Invalid status transition",
            Self::InvalidInput => "Invalid input",
            Self::Unauthenticated => "Not signed in",
            Self::InvalidCredentials => "Invalid Email or Password",
            Self::PermissionDenied => "Permission denied",
            Self::RemoteUnavailable => "Remote store unavailable",
            Self::AuthProviderError => "Auth provider error",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .muster/config.toml and retry."),
            Self::SubscriptionFailed => {
                Some("Showing the last known data; the remote store reconnects on its own.")
            }
            Self::SnapshotRejected => {
                Some("A document has a field of the wrong type; fix it in the remote store.")
            }
            Self::RecordNotFound | Self::InvalidInput => None,
            Self::DanglingReference => {
                Some("The referenced record was deleted; reassign the reference.")
            }
            Self::InvalidStateTransition => {
                Some("Follow valid transitions: PENDING -> PAID or PENDING -> DISPUTED.")
            }
            Self::Unauthenticated => Some("Sign in before making changes."),
            Self::InvalidCredentials => Some("Check the email and password and retry."),
            Self::PermissionDenied => Some("Ask an administrator for write access."),
            Self::RemoteUnavailable => Some("Check connectivity and retry the action."),
            Self::AuthProviderError => Some("Retry sign-in. If persistent, check provider status."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
