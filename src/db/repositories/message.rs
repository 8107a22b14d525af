use crate::domain::{MessageId, UserId};
use crate::entities::{messages, prelude::*};
use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, Set};
use tracing::debug;

use super::user::User;

/// Repository for message operations
pub struct MessageRepository {
    conn: DatabaseConnection,
}

impl MessageRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, author_id: UserId, title: &str, text: &str) -> Result<MessageId> {
        let active_model = messages::ActiveModel {
            title: Set(title.to_string()),
            text: Set(text.to_string()),
            timestamp: Set(chrono::Utc::now().to_rfc3339()),
            author_id: Set(author_id.value()),
            ..Default::default()
        };

        let res = Messages::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert message")?;
        debug!(author_id = %author_id, message_id = res.last_insert_id, "Inserted message row");
        Ok(MessageId::new(res.last_insert_id))
    }

    pub async fn get(&self, id: MessageId) -> Result<Option<Message>> {
        let row = Messages::find_by_id(id.value())
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query message")?;

        Ok(row.map(Self::map_row))
    }

    /// All messages in creation order, each joined with its author.
    pub async fn list_with_authors(&self) -> Result<Vec<Message>> {
        let rows = Messages::find()
            .find_also_related(Users)
            .order_by_asc(messages::Column::Timestamp)
            .order_by_asc(messages::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list messages")?;

        Ok(rows.into_iter().map(Self::map_row).collect())
    }

    /// Returns whether a row was removed. Deleting a missing id is not an error.
    pub async fn remove(&self, id: MessageId) -> Result<bool> {
        let result = Messages::delete_by_id(id.value())
            .exec(&self.conn)
            .await
            .context("Failed to delete message")?;
        Ok(result.rows_affected > 0)
    }

    fn map_row(
        (message, author): (messages::Model, Option<crate::entities::users::Model>),
    ) -> Message {
        Message {
            id: MessageId::new(message.id),
            title: message.title,
            text: message.text,
            timestamp: message.timestamp,
            author_id: UserId::new(message.author_id),
            author: author.map(User::from),
        }
    }
}

// ============================================================================
// Data Types
// ============================================================================

#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub title: String,
    pub text: String,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub author_id: UserId,
    /// `None` only if the author row vanished between insert and read.
    pub author: Option<User>,
}

impl Message {
    /// Human readable timestamp, falling back to the raw value if it does not parse.
    #[must_use]
    pub fn timestamp_formatted(&self) -> String {
        chrono::DateTime::parse_from_rfc3339(&self.timestamp).map_or_else(
            |_| self.timestamp.clone(),
            |ts| ts.format("%b %-d, %Y %H:%M").to_string(),
        )
    }
}
