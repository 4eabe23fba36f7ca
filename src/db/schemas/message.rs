//! Chat message document schema
//!
//! Messages are append-only; there is no edit or delete path.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::{Metadata, UserRef};
use crate::types::{GardenError, Id, Timestamp};

/// Collection name for chat messages
pub const MESSAGE_COLLECTION: &str = "messages";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDoc {
    #[serde(rename = "_id")]
    pub id: Id,

    pub text: String,

    /// Author
    pub user: Id,

    /// Parent garden
    pub garden: Id,

    #[serde(flatten)]
    pub metadata: Metadata,
}

impl IntoIndexes for MessageDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "garden": 1, "createdAt": 1 },
            Some(
                IndexOptions::builder()
                    .name("garden_created_index".to_string())
                    .build(),
            ),
        )]
    }
}

/// Where a chat poll resumes.
///
/// Timestamps have millisecond precision, so several messages can share one.
/// With `after` set, the poll returns messages strictly past
/// `(created_at, after)` in log order. Without it, every message created at or
/// after `created_at` comes back and the client drops the ids it has seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageCursor {
    pub created_at: Timestamp,
    pub after: Option<Id>,
}

impl MessageCursor {
    pub fn new(created_at: Timestamp) -> Self {
        Self {
            created_at,
            after: None,
        }
    }

    /// Cursor positioned on a message already delivered
    pub fn past(message: &MessageDoc) -> Self {
        Self {
            created_at: message.metadata.created_at,
            after: Some(message.id.clone()),
        }
    }

    pub fn admits(&self, message: &MessageDoc) -> bool {
        let created_at = message.metadata.created_at;
        match &self.after {
            None => created_at >= self.created_at,
            Some(after) => (created_at, &message.id) > (self.created_at, after),
        }
    }

    /// The same condition as a MongoDB filter on `createdAt` and `_id`
    pub fn filter(&self) -> Document {
        let created_at = self.created_at.to_string();
        match &self.after {
            None => doc! { "createdAt": { "$gte": created_at } },
            Some(after) => doc! {
                "$or": [
                    { "createdAt": { "$gt": created_at.clone() } },
                    { "createdAt": created_at, "_id": { "$gt": after } },
                ]
            },
        }
    }
}

/// Body of a chat post
#[derive(Deserialize, Clone, Debug, Default)]
pub struct NewMessage {
    #[serde(default)]
    pub text: String,
}

impl NewMessage {
    pub fn validate(&self) -> Result<(), GardenError> {
        if self.text.trim().is_empty() {
            return Err(GardenError::invalid("text", "Message text is required"));
        }
        Ok(())
    }

    pub fn into_doc(self, garden: Id, user: Id) -> MessageDoc {
        MessageDoc {
            id: Id::new(),
            text: self.text,
            user,
            garden,
            metadata: Metadata::new(),
        }
    }
}

/// A message with its author resolved for display
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(rename = "_id")]
    pub id: Id,
    pub text: String,
    pub user: UserRef,
    pub garden: Id,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl MessageView {
    pub fn new(message: MessageDoc, user: UserRef) -> Self {
        Self {
            id: message.id,
            text: message.text,
            user,
            garden: message.garden,
            metadata: message.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_rejected() {
        let err = NewMessage { text: "   ".into() }.validate().unwrap_err();
        assert!(matches!(err, GardenError::Validation(ref f) if f[0].message == "Message text is required"));
        assert!(NewMessage { text: "hello".into() }.validate().is_ok());
    }

    fn message_at(id: &str, created_at: Timestamp) -> MessageDoc {
        let mut message = NewMessage { text: "hi".into() }.into_doc(Id::new(), Id::new());
        message.id = Id::parse(id, "Message").unwrap();
        message.metadata.created_at = created_at;
        message
    }

    #[test]
    fn test_cursor_orders_messages_sharing_a_millisecond() {
        let at = Timestamp::parse("2024-05-01T10:00:00.123Z").unwrap();
        let first = message_at("65a1b2c3d4e5f60718293a01", at);
        let second = message_at("65a1b2c3d4e5f60718293a02", at);

        let cursor = MessageCursor::past(&first);
        assert!(!cursor.admits(&first));
        assert!(cursor.admits(&second));

        let inclusive = MessageCursor::new(at);
        assert!(inclusive.admits(&first));
        assert!(inclusive.admits(&second));
    }

    #[test]
    fn test_cursor_filter_breaks_ties_on_id() {
        let at = Timestamp::parse("2024-05-01T10:00:00Z").unwrap();
        let after = Id::parse("65a1b2c3d4e5f60718293a01", "Message").unwrap();
        let filter = MessageCursor {
            created_at: at,
            after: Some(after.clone()),
        }
        .filter();
        assert_eq!(
            filter,
            doc! { "$or": [
                { "createdAt": { "$gt": "2024-05-01T10:00:00.000Z" } },
                { "createdAt": "2024-05-01T10:00:00.000Z", "_id": { "$gt": after.as_str() } },
            ] }
        );
        assert_eq!(
            MessageCursor::new(at).filter(),
            doc! { "createdAt": { "$gte": "2024-05-01T10:00:00.000Z" } }
        );
    }

    #[test]
    fn test_view_shows_author_inline() {
        let author = Id::new();
        let message = NewMessage { text: "Compost is ready".into() }.into_doc(Id::new(), author.clone());
        let view = MessageView::new(message, UserRef::Unknown(author.clone()));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["user"], author.as_str());
        assert_eq!(json["text"], "Compost is ready");
        assert!(json.get("createdAt").is_some());
    }
}
