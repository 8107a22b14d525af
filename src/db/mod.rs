use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::{MessageId, UserId};

pub mod migrator;
pub mod repositories;

pub use repositories::message::Message;
pub use repositories::user::{InsertOutcome, NewUser, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn message_repo(&self) -> repositories::message::MessageRepository {
        repositories::message::MessageRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_with_password(&self, email: &str) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_email_with_password(email).await
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        self.user_repo().email_exists(email).await
    }

    pub async fn insert_user(&self, new_user: NewUser) -> Result<InsertOutcome> {
        self.user_repo().insert(new_user).await
    }

    pub async fn grant_membership(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().grant_membership(id).await
    }

    pub async fn grant_admin(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().grant_admin(id).await
    }

    // ========================================================================
    // Messages
    // ========================================================================

    pub async fn add_message(
        &self,
        author_id: UserId,
        title: &str,
        text: &str,
    ) -> Result<MessageId> {
        self.message_repo().add(author_id, title, text).await
    }

    pub async fn get_message(&self, id: MessageId) -> Result<Option<Message>> {
        self.message_repo().get(id).await
    }

    pub async fn list_messages(&self) -> Result<Vec<Message>> {
        self.message_repo().list_with_authors().await
    }

    pub async fn remove_message(&self, id: MessageId) -> Result<bool> {
        self.message_repo().remove(id).await
    }
}
