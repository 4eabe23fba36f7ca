//! Garden chat
//!
//! An append-only log per garden. Clients poll with a `MessageCursor` built
//! from the last message they saw to fetch only what arrived after it.

use std::sync::Arc;
use tracing::debug;

use crate::db::schemas::{MessageCursor, MessageDoc, MessageView, NewMessage, UserRef};
use crate::store::GardenStore;
use crate::types::{GardenError, Id, Result};

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn GardenStore>,
}

impl ChatService {
    pub fn new(store: Arc<dyn GardenStore>) -> Self {
        Self { store }
    }

    pub async fn post_message(&self, garden: &Id, user: &Id, input: NewMessage) -> Result<MessageView> {
        input.validate()?;
        if self.store.find_garden(garden).await?.is_none() {
            return Err(GardenError::NotFound("Garden not found".into()));
        }

        let message = input.into_doc(garden.clone(), user.clone());
        self.store.insert_message(&message).await?;
        debug!(garden = %garden, message = %message.id, "Message posted");

        let mut views = self.with_authors(vec![message]).await?;
        views
            .pop()
            .ok_or_else(|| GardenError::Internal("posted message vanished".into()))
    }

    /// Messages oldest first, optionally only those the cursor admits
    pub async fn list_messages(
        &self,
        garden: &Id,
        cursor: Option<MessageCursor>,
    ) -> Result<Vec<MessageView>> {
        let messages = self.store.messages_for(garden, cursor.as_ref()).await?;
        self.with_authors(messages).await
    }

    async fn with_authors(&self, messages: Vec<MessageDoc>) -> Result<Vec<MessageView>> {
        let mut authors: Vec<Id> = messages.iter().map(|m| m.user.clone()).collect();
        authors.sort();
        authors.dedup();
        let users = self.store.find_users(&authors).await?;

        Ok(messages
            .into_iter()
            .map(|m| {
                let author = UserRef::resolve(&m.user, &users);
                MessageView::new(m, author)
            })
            .collect())
    }
}
