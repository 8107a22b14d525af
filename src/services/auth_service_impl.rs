//! `SeaORM` implementation of the `AuthService` trait.

use crate::config::SecurityConfig;
use crate::db::repositories::user::{hash_password_blocking, verify_password_blocking};
use crate::db::{InsertOutcome, NewUser, Store, User};
use crate::domain::UserId;
use crate::services::auth_service::{AuthError, AuthService, Registration};
use async_trait::async_trait;

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Some((user, password_hash)) = self.store.get_user_with_password(email).await? else {
            return Err(AuthError::NoSuchUser);
        };

        let matches = verify_password_blocking(password.to_string(), password_hash).await?;
        if !matches {
            return Err(AuthError::BadPassword);
        }

        Ok(user)
    }

    async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let Registration {
            firstname,
            lastname,
            email,
            password,
        } = registration;

        let password_hash = hash_password_blocking(password, self.security.clone()).await?;

        let outcome = self
            .store
            .insert_user(NewUser {
                firstname,
                lastname,
                email,
                password_hash,
            })
            .await?;

        match outcome {
            InsertOutcome::Created(user) => Ok(user),
            InsertOutcome::EmailTaken => Err(AuthError::EmailTaken),
        }
    }

    async fn find_principal(&self, id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user(id).await?)
    }

    async fn grant_membership(&self, id: UserId) -> Result<User, AuthError> {
        self.store
            .grant_membership(id)
            .await?
            .ok_or(AuthError::UserNotFound(id))
    }

    async fn grant_admin(&self, id: UserId) -> Result<User, AuthError> {
        self.store
            .grant_admin(id)
            .await?
            .ok_or(AuthError::UserNotFound(id))
    }
}
