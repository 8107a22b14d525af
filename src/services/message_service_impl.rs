//! `SeaORM` implementation of the `MessageService` trait.

use crate::db::{Message, Store, User};
use crate::domain::MessageId;
use crate::services::message_service::{MessageError, MessageService};
use async_trait::async_trait;

pub struct SeaOrmMessageService {
    store: Store,
}

impl SeaOrmMessageService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MessageService for SeaOrmMessageService {
    async fn list(&self) -> Result<Vec<Message>, MessageError> {
        Ok(self.store.list_messages().await?)
    }

    async fn create(
        &self,
        author: &User,
        title: &str,
        text: &str,
    ) -> Result<MessageId, MessageError> {
        Ok(self.store.add_message(author.id, title, text).await?)
    }

    async fn delete(&self, id: MessageId) -> Result<bool, MessageError> {
        Ok(self.store.remove_message(id).await?)
    }
}
