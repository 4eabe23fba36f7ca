//! Entity store
//!
//! Persistence for gardens, their children, chat messages and the user
//! directory. Services receive an `Arc<dyn GardenStore>`; there is no global
//! connection.
//!
//! Reference-list changes go through `add_to_list` / `remove_from_list`,
//! which are atomic in every implementation. Callers never read a garden,
//! edit its list and write it back.

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use crate::db::schemas::{
    Child, ChildKind, ChildPatch, EventDoc, GardenDoc, GardenList, MessageCursor, MessageDoc,
    UserDoc,
};
use crate::types::{Id, Result};

#[async_trait::async_trait]
pub trait GardenStore: Send + Sync {
    // Gardens

    async fn insert_garden(&self, garden: &GardenDoc) -> Result<()>;

    async fn find_garden(&self, id: &Id) -> Result<Option<GardenDoc>>;

    /// All gardens, oldest first
    async fn list_gardens(&self) -> Result<Vec<GardenDoc>>;

    /// Gardens the user owns or is a member of
    async fn gardens_for_user(&self, user: &Id) -> Result<Vec<GardenDoc>>;

    async fn gardens_owned_by(&self, user: &Id) -> Result<Vec<GardenDoc>>;

    /// Returns whether a garden was removed
    async fn delete_garden(&self, id: &Id) -> Result<bool>;

    /// Add `id` to one of the garden's lists unless present.
    /// Returns whether the garden exists.
    async fn add_to_list(&self, garden: &Id, list: GardenList, id: &Id) -> Result<bool>;

    /// Remove every occurrence of `id` from one of the garden's lists.
    /// Returns whether the garden exists.
    async fn remove_from_list(&self, garden: &Id, list: GardenList, id: &Id) -> Result<bool>;

    // Children

    async fn insert_child(&self, child: &Child) -> Result<()>;

    async fn find_child(&self, kind: ChildKind, id: &Id) -> Result<Option<Child>>;

    /// Apply a patch atomically and return the updated child
    async fn update_child(&self, id: &Id, patch: &ChildPatch) -> Result<Option<Child>>;

    /// Returns whether a child was removed
    async fn delete_child(&self, kind: ChildKind, id: &Id) -> Result<bool>;

    /// Children naming `garden` as parent. Plants and tasks come newest
    /// first, events by date ascending.
    async fn children_of(&self, garden: &Id, kind: ChildKind) -> Result<Vec<Child>>;

    async fn delete_children_of(&self, garden: &Id, kind: ChildKind) -> Result<u64>;

    /// Most recently created children of a kind across all gardens
    async fn recent_children(&self, kind: ChildKind, limit: usize) -> Result<Vec<Child>>;

    /// Add the user to the event's attendees if absent, else remove them
    async fn toggle_attendee(&self, event: &Id, user: &Id) -> Result<Option<EventDoc>>;

    // Messages

    async fn insert_message(&self, message: &MessageDoc) -> Result<()>;

    /// Messages of a garden in `(createdAt, _id)` order, optionally only
    /// those the cursor admits
    async fn messages_for(
        &self,
        garden: &Id,
        cursor: Option<&MessageCursor>,
    ) -> Result<Vec<MessageDoc>>;

    async fn delete_messages_of(&self, garden: &Id) -> Result<u64>;

    // Users

    async fn find_users(&self, ids: &[Id]) -> Result<Vec<UserDoc>>;
}

/// Sort children the way listings show them
pub(crate) fn sort_for_listing(kind: ChildKind, children: &mut [Child]) {
    match kind {
        ChildKind::Event => children.sort_by(|a, b| match (a, b) {
            (Child::Event(a), Child::Event(b)) => (a.date, &a.id).cmp(&(b.date, &b.id)),
            _ => std::cmp::Ordering::Equal,
        }),
        _ => children.sort_by(|a, b| (b.created_at(), b.id()).cmp(&(a.created_at(), a.id()))),
    }
}
