//! Domain service for authentication and the membership upgrades.
//!
//! Holds the credential verifier, registration (hash then persist) and the
//! principal lookup used to rebuild the current user on every request.

use std::fmt;

use thiserror::Error;

use crate::db::User;
use crate::domain::UserId;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No account carries the submitted email.
    #[error("Incorrect username")]
    NoSuchUser,

    #[error("Incorrect password")]
    BadPassword,

    #[error("A user already exists with this email address.")]
    EmailTaken,

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// True for the two failures a visitor can cause by typing the wrong thing.
    #[must_use]
    pub const fn is_credential_failure(&self) -> bool {
        matches!(self, Self::NoSuchUser | Self::BadPassword)
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// A validated registration. The password is plaintext and only lives until it is hashed.
#[derive(Clone)]
pub struct Registration {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("firstname", &self.firstname)
            .field("lastname", &self.lastname)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Looks up exactly one user by email and checks the password against its hash.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoSuchUser`] or [`AuthError::BadPassword`] when the
    /// credentials do not match; lookup and hashing failures are reported as
    /// [`AuthError::Database`] / [`AuthError::Internal`].
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, AuthError>;

    /// Hashes the password and persists a new, non-member user.
    ///
    /// Returns only after both the hash and the insert have completed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailTaken`] if the unique email index rejects the row.
    async fn register(&self, registration: Registration) -> Result<User, AuthError>;

    /// Resolves a session principal id to a fresh user record.
    async fn find_principal(&self, id: UserId) -> Result<Option<User>, AuthError>;

    /// Sets the membership flag.
    async fn grant_membership(&self, id: UserId) -> Result<User, AuthError>;

    /// Sets the admin flag and the membership flag together.
    async fn grant_admin(&self, id: UserId) -> Result<User, AuthError>;
}
