//! Domain service for the message board.

use thiserror::Error;

use crate::db::{Message, User};
use crate::domain::MessageId;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for MessageError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for MessageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[async_trait::async_trait]
pub trait MessageService: Send + Sync {
    /// All messages in creation order with their authors resolved.
    async fn list(&self) -> Result<Vec<Message>, MessageError>;

    /// Persists a message authored by `author`. Title and text must already be validated.
    async fn create(
        &self,
        author: &User,
        title: &str,
        text: &str,
    ) -> Result<MessageId, MessageError>;

    /// Deletes unconditionally; returns `false` when nothing matched.
    async fn delete(&self, id: MessageId) -> Result<bool, MessageError>;
}
