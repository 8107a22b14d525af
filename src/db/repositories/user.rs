use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::domain::UserId;
use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub membership_status: bool,
    pub admin: bool,
    pub created_at: String,
}

impl User {
    #[must_use]
    pub fn fullname(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: UserId::new(model.id),
            firstname: model.firstname,
            lastname: model.lastname,
            email: model.email,
            membership_status: model.membership_status,
            admin: model.admin.unwrap_or(false),
            created_at: model.created_at,
        }
    }
}

/// Registration input. The password field is a finished hash, never plaintext.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
}

/// Outcome of an insert that may collide with the unique email index.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(User),
    EmailTaken,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by email (emails are stored lowercased)
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// Get user by email together with the stored password hash (for verification)
    pub async fn get_by_email_with_password(&self, email: &str) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.get_by_email(email).await?.is_some())
    }

    pub async fn insert(&self, new_user: NewUser) -> Result<InsertOutcome> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            firstname: Set(new_user.firstname),
            lastname: Set(new_user.lastname),
            email: Set(new_user.email.to_lowercase()),
            password_hash: Set(new_user.password_hash),
            membership_status: Set(false),
            admin: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(InsertOutcome::Created(User::from(model))),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::EmailTaken),
            Err(err) => Err(err).context("Failed to insert user"),
        }
    }

    /// Sets the membership flag. Returns `None` if the user no longer exists.
    pub async fn grant_membership(&self, id: UserId) -> Result<Option<User>> {
        self.update_flags(id, |active| {
            active.membership_status = Set(true);
        })
        .await
    }

    /// Sets the admin flag. Admin always implies membership.
    pub async fn grant_admin(&self, id: UserId) -> Result<Option<User>> {
        self.update_flags(id, |active| {
            active.admin = Set(Some(true));
            active.membership_status = Set(true);
        })
        .await
    }

    async fn update_flags<F>(&self, id: UserId, apply: F) -> Result<Option<User>>
    where
        F: FnOnce(&mut users::ActiveModel),
    {
        let Some(user) = users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
        else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        apply(&mut active);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;

        Ok(Some(User::from(model)))
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the crate's default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Checks `password` against a PHC hash string. Params are read from the hash itself.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Runs [`hash_password`] off the async runtime; Argon2 is CPU-bound.
pub async fn hash_password_blocking(password: String, config: SecurityConfig) -> Result<String> {
    task::spawn_blocking(move || hash_password(&password, Some(&config)))
        .await
        .context("Password hashing task panicked")?
}

/// Runs [`verify_password`] off the async runtime.
pub async fn verify_password_blocking(password: String, password_hash: String) -> Result<bool> {
    task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .context("Password verification task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        }
    }

    #[test]
    fn hash_never_equals_plaintext_and_verifies() {
        let hash = hash_password("Abcd123!", Some(&cheap())).unwrap();
        assert_ne!(hash, "Abcd123!");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Abcd123!", &hash).unwrap());
        assert!(!verify_password("Abcd123?", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("Abcd123!", Some(&cheap())).unwrap();
        let b = hash_password("Abcd123!", Some(&cheap())).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("Abcd123!", "not-a-phc-string").is_err());
    }

    #[test]
    fn fullname_joins_names() {
        let user = User {
            id: UserId::new(1),
            firstname: "Ann".to_string(),
            lastname: "Lee".to_string(),
            email: "ann@example.com".to_string(),
            membership_status: false,
            admin: false,
            created_at: String::new(),
        };
        assert_eq!(user.fullname(), "Ann Lee");
    }
}
