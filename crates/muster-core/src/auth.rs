//! Sign-in gate for mutations.
//!
//! The auth provider is external. The core only needs to know whether a
//! user is present; every write path calls [`require_user`] first.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::error::ErrorCode;

/// Provider code for a wrong email/password pair.
pub const INVALID_CREDENTIAL_CODE: &str = "auth/invalid-credential";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("sign in to make changes")]
    Unauthenticated,
    #[error("Invalid Email or Password")]
    InvalidCredentials,
    #[error("Something went wrong, [ {code} ]")]
    Provider { code: String },
}

impl AuthError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthenticated => ErrorCode::Unauthenticated,
            Self::InvalidCredentials => ErrorCode::InvalidCredentials,
            Self::Provider { .. } => ErrorCode::AuthProviderError,
        }
    }
}

/// Translate an auth provider error code into an [`AuthError`].
#[must_use]
pub fn map_provider_code(code: &str) -> AuthError {
    if code == INVALID_CREDENTIAL_CODE {
        AuthError::InvalidCredentials
    } else {
        AuthError::Provider {
            code: code.to_string(),
        }
    }
}

/// External authentication capability.
pub trait AuthSession: Send + Sync {
    fn current_user(&self) -> Option<CurrentUser>;

    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] for a wrong email/password pair,
    /// [`AuthError::Provider`] for anything else the provider reports.
    fn sign_in(&self, credentials: &Credentials) -> Result<CurrentUser, AuthError>;

    fn sign_out(&self);
}

/// The signed-in user, or [`AuthError::Unauthenticated`].
///
/// # Errors
///
/// Fails when nobody is signed in.
pub fn require_user(session: &dyn AuthSession) -> Result<CurrentUser, AuthError> {
    session.current_user().ok_or(AuthError::Unauthenticated)
}

/// In-process credential table.
#[derive(Default)]
pub struct StaticAuthSession {
    accounts: BTreeMap<String, String>,
    current: Mutex<Option<CurrentUser>>,
}

impl StaticAuthSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_account(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.accounts.insert(email.into(), password.into());
        self
    }

    /// A session already signed in as `email`, without a password check.
    #[must_use]
    pub fn signed_in_as(email: &str) -> Self {
        let session = Self::new();
        *session.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(user_for(email));
        session
    }
}

impl fmt::Debug for StaticAuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticAuthSession")
            .field("accounts", &self.accounts.len())
            .field("current", &self.current_user().map(|user| user.email))
            .finish()
    }
}

impl AuthSession for StaticAuthSession {
    fn current_user(&self) -> Option<CurrentUser> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn sign_in(&self, credentials: &Credentials) -> Result<CurrentUser, AuthError> {
        if !credentials.email.contains('@') {
            return Err(map_provider_code("auth/invalid-email"));
        }
        match self.accounts.get(&credentials.email) {
            Some(password) if *password == credentials.password => {
                let user = user_for(&credentials.email);
                *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(user.clone());
                tracing::info!(email = %user.email, "signed in");
                Ok(user)
            }
            _ => Err(map_provider_code(INVALID_CREDENTIAL_CODE)),
        }
    }

    fn sign_out(&self) {
        if let Some(user) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            tracing::info!(email = %user.email, "signed out");
        }
    }
}

fn user_for(email: &str) -> CurrentUser {
    CurrentUser {
        uid: format!("local:{email}"),
        email: email.to_string(),
        display_name: None,
        email_verified: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_codes_map_to_messages() {
        assert_eq!(
            map_provider_code("auth/invalid-credential").to_string(),
            "Invalid Email or Password"
        );
        let other = map_provider_code("auth/too-many-requests");
        assert_eq!(
            other.to_string(),
            "Something went wrong, [ auth/too-many-requests ]"
        );
        assert_eq!(other.code(), ErrorCode::AuthProviderError);
    }

    #[test]
    fn sign_in_and_out() {
        let session = StaticAuthSession::new().with_account("ops@example.com", "hunter2");
        assert!(require_user(&session).is_err());

        let err = session
            .sign_in(&Credentials::new("ops@example.com", "wrong"))
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);

        let user = session
            .sign_in(&Credentials::new("ops@example.com", "hunter2"))
            .unwrap();
        assert_eq!(require_user(&session).unwrap(), user);

        session.sign_out();
        assert_eq!(require_user(&session), Err(AuthError::Unauthenticated));
    }

    #[test]
    fn malformed_email_is_a_provider_error() {
        let session = StaticAuthSession::new();
        let err = session.sign_in(&Credentials::new("nobody", "x")).unwrap_err();
        assert!(matches!(err, AuthError::Provider { code } if code == "auth/invalid-email"));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("a@b.c", "secret");
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
