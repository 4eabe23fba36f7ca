//! In-memory store
//!
//! Backs dev mode when MongoDB is unreachable, and the test suite. Each
//! mutation runs under the DashMap shard lock of the entry it touches, which
//! gives the same per-document atomicity MongoDB gives.

use dashmap::{mapref::entry::Entry, DashMap};

use crate::db::schemas::{
    Child, ChildKind, ChildPatch, EventDoc, GardenDoc, GardenList, MessageCursor, MessageDoc,
    PlantDoc, TaskDoc, UserDoc,
};
use crate::store::{sort_for_listing, GardenStore};
use crate::types::{GardenError, Id, Result};

#[derive(Default)]
pub struct MemoryStore {
    gardens: DashMap<Id, GardenDoc>,
    plants: DashMap<Id, PlantDoc>,
    tasks: DashMap<Id, TaskDoc>,
    events: DashMap<Id, EventDoc>,
    messages: DashMap<Id, MessageDoc>,
    users: DashMap<Id, UserDoc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user account. Accounts normally come from the auth service.
    pub fn insert_user(&self, user: UserDoc) {
        self.users.insert(user.id.clone(), user);
    }

    /// Overwrite a garden document as-is, bypassing the list operations.
    /// Only useful for simulating drift in tests.
    pub fn put_garden(&self, garden: GardenDoc) {
        self.gardens.insert(garden.id.clone(), garden);
    }

    fn sorted_gardens(&self, keep: impl Fn(&GardenDoc) -> bool) -> Vec<GardenDoc> {
        let mut gardens: Vec<GardenDoc> = self
            .gardens
            .iter()
            .filter(|g| keep(g.value()))
            .map(|g| g.value().clone())
            .collect();
        gardens.sort_by(|a, b| (a.metadata.created_at, &a.id).cmp(&(b.metadata.created_at, &b.id)));
        gardens
    }

    fn all_children(&self, kind: ChildKind) -> Vec<Child> {
        match kind {
            ChildKind::Plant => self.plants.iter().map(|p| Child::Plant(p.value().clone())).collect(),
            ChildKind::Task => self.tasks.iter().map(|t| Child::Task(t.value().clone())).collect(),
            ChildKind::Event => self.events.iter().map(|e| Child::Event(e.value().clone())).collect(),
        }
    }
}

fn insert_new<T: Clone>(map: &DashMap<Id, T>, id: Id, doc: &T) -> bool {
    match map.entry(id) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(doc.clone());
            true
        }
    }
}

#[async_trait::async_trait]
impl GardenStore for MemoryStore {
    async fn insert_garden(&self, garden: &GardenDoc) -> Result<()> {
        if !insert_new(&self.gardens, garden.id.clone(), garden) {
            return Err(GardenError::Database(format!("duplicate garden id {}", garden.id)));
        }
        Ok(())
    }

    async fn find_garden(&self, id: &Id) -> Result<Option<GardenDoc>> {
        Ok(self.gardens.get(id).map(|g| g.value().clone()))
    }

    async fn list_gardens(&self) -> Result<Vec<GardenDoc>> {
        Ok(self.sorted_gardens(|_| true))
    }

    async fn gardens_for_user(&self, user: &Id) -> Result<Vec<GardenDoc>> {
        Ok(self.sorted_gardens(|g| &g.owner == user || g.is_member(user)))
    }

    async fn gardens_owned_by(&self, user: &Id) -> Result<Vec<GardenDoc>> {
        Ok(self.sorted_gardens(|g| &g.owner == user))
    }

    async fn delete_garden(&self, id: &Id) -> Result<bool> {
        Ok(self.gardens.remove(id).is_some())
    }

    async fn add_to_list(&self, garden: &Id, list: GardenList, id: &Id) -> Result<bool> {
        let Some(mut entry) = self.gardens.get_mut(garden) else {
            return Ok(false);
        };
        let items = entry.list_mut(list);
        if !items.contains(id) {
            items.push(id.clone());
        }
        entry.metadata.touch();
        Ok(true)
    }

    async fn remove_from_list(&self, garden: &Id, list: GardenList, id: &Id) -> Result<bool> {
        let Some(mut entry) = self.gardens.get_mut(garden) else {
            return Ok(false);
        };
        entry.list_mut(list).retain(|item| item != id);
        entry.metadata.touch();
        Ok(true)
    }

    async fn insert_child(&self, child: &Child) -> Result<()> {
        let id = child.id().clone();
        let inserted = match child {
            Child::Plant(p) => insert_new(&self.plants, id.clone(), p),
            Child::Task(t) => insert_new(&self.tasks, id.clone(), t),
            Child::Event(e) => insert_new(&self.events, id.clone(), e),
        };
        if !inserted {
            return Err(GardenError::Database(format!("duplicate {} id {}", child.kind().label(), id)));
        }
        Ok(())
    }

    async fn find_child(&self, kind: ChildKind, id: &Id) -> Result<Option<Child>> {
        Ok(match kind {
            ChildKind::Plant => self.plants.get(id).map(|p| Child::Plant(p.value().clone())),
            ChildKind::Task => self.tasks.get(id).map(|t| Child::Task(t.value().clone())),
            ChildKind::Event => self.events.get(id).map(|e| Child::Event(e.value().clone())),
        })
    }

    async fn update_child(&self, id: &Id, patch: &ChildPatch) -> Result<Option<Child>> {
        match patch {
            ChildPatch::Plant(p) => Ok(self.plants.get_mut(id).map(|mut doc| {
                p.apply(&mut doc);
                Child::Plant(doc.clone())
            })),
            ChildPatch::Task(t) => Ok(self.tasks.get_mut(id).map(|mut doc| {
                t.apply(&mut doc);
                Child::Task(doc.clone())
            })),
            ChildPatch::Event(e) => Ok(self.events.get_mut(id).map(|mut doc| {
                e.apply(&mut doc);
                Child::Event(doc.clone())
            })),
        }
    }

    async fn delete_child(&self, kind: ChildKind, id: &Id) -> Result<bool> {
        Ok(match kind {
            ChildKind::Plant => self.plants.remove(id).is_some(),
            ChildKind::Task => self.tasks.remove(id).is_some(),
            ChildKind::Event => self.events.remove(id).is_some(),
        })
    }

    async fn children_of(&self, garden: &Id, kind: ChildKind) -> Result<Vec<Child>> {
        let mut children: Vec<Child> = self
            .all_children(kind)
            .into_iter()
            .filter(|c| c.garden() == garden)
            .collect();
        sort_for_listing(kind, &mut children);
        Ok(children)
    }

    async fn delete_children_of(&self, garden: &Id, kind: ChildKind) -> Result<u64> {
        let removed = match kind {
            ChildKind::Plant => {
                let before = self.plants.len();
                self.plants.retain(|_, p| &p.garden != garden);
                before - self.plants.len()
            }
            ChildKind::Task => {
                let before = self.tasks.len();
                self.tasks.retain(|_, t| &t.garden != garden);
                before - self.tasks.len()
            }
            ChildKind::Event => {
                let before = self.events.len();
                self.events.retain(|_, e| &e.garden != garden);
                before - self.events.len()
            }
        };
        Ok(removed as u64)
    }

    async fn recent_children(&self, kind: ChildKind, limit: usize) -> Result<Vec<Child>> {
        let mut children = self.all_children(kind);
        children.sort_by(|a, b| (b.created_at(), b.id()).cmp(&(a.created_at(), a.id())));
        children.truncate(limit);
        Ok(children)
    }

    async fn toggle_attendee(&self, event: &Id, user: &Id) -> Result<Option<EventDoc>> {
        Ok(self.events.get_mut(event).map(|mut doc| {
            doc.toggle_attendee(user);
            doc.metadata.touch();
            doc.clone()
        }))
    }

    async fn insert_message(&self, message: &MessageDoc) -> Result<()> {
        self.messages.insert(message.id.clone(), message.clone());
        Ok(())
    }

    async fn messages_for(
        &self,
        garden: &Id,
        cursor: Option<&MessageCursor>,
    ) -> Result<Vec<MessageDoc>> {
        let mut messages: Vec<MessageDoc> = self
            .messages
            .iter()
            .filter(|m| &m.garden == garden)
            .filter(|m| cursor.map_or(true, |c| c.admits(m)))
            .map(|m| m.value().clone())
            .collect();
        messages.sort_by(|a, b| (a.metadata.created_at, &a.id).cmp(&(b.metadata.created_at, &b.id)));
        Ok(messages)
    }

    async fn delete_messages_of(&self, garden: &Id) -> Result<u64> {
        let before = self.messages.len();
        self.messages.retain(|_, m| &m.garden != garden);
        Ok((before - self.messages.len()) as u64)
    }

    async fn find_users(&self, ids: &[Id]) -> Result<Vec<UserDoc>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{NewGarden, NewPlant};
    use std::sync::Arc;

    fn garden() -> GardenDoc {
        NewGarden {
            name: "Elm St".into(),
            description: "desc".into(),
            location: "123 Elm".into(),
            ..Default::default()
        }
        .into_doc(Id::new())
    }

    #[tokio::test]
    async fn test_list_ops_are_set_like() {
        let store = MemoryStore::new();
        let g = garden();
        store.insert_garden(&g).await.unwrap();
        let user = Id::new();

        assert!(store.add_to_list(&g.id, GardenList::Members, &user).await.unwrap());
        assert!(store.add_to_list(&g.id, GardenList::Members, &user).await.unwrap());
        let found = store.find_garden(&g.id).await.unwrap().unwrap();
        assert_eq!(found.members, vec![g.owner.clone(), user.clone()]);

        assert!(store.remove_from_list(&g.id, GardenList::Members, &user).await.unwrap());
        assert!(store.remove_from_list(&g.id, GardenList::Members, &user).await.unwrap());
        let found = store.find_garden(&g.id).await.unwrap().unwrap();
        assert_eq!(found.members, vec![g.owner.clone()]);

        assert!(!store.add_to_list(&Id::new(), GardenList::Plants, &user).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let g = garden();
        store.insert_garden(&g).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            let garden = g.id.clone();
            handles.push(tokio::spawn(async move {
                store.add_to_list(&garden, GardenList::Plants, &Id::new()).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }

        let found = store.find_garden(&g.id).await.unwrap().unwrap();
        assert_eq!(found.plants.len(), 32);
    }

    #[tokio::test]
    async fn test_children_filtered_by_parent() {
        let store = MemoryStore::new();
        let a = Id::new();
        let b = Id::new();
        for garden in [&a, &a, &b] {
            let plant = NewPlant {
                name: "Tomato".into(),
                species: "Solanum".into(),
                ..Default::default()
            }
            .into_doc(garden.clone(), Id::new());
            store.insert_child(&Child::Plant(plant)).await.unwrap();
        }

        assert_eq!(store.children_of(&a, ChildKind::Plant).await.unwrap().len(), 2);
        assert_eq!(store.delete_children_of(&a, ChildKind::Plant).await.unwrap(), 2);
        assert!(store.children_of(&a, ChildKind::Plant).await.unwrap().is_empty());
        assert_eq!(store.children_of(&b, ChildKind::Plant).await.unwrap().len(), 1);
    }
}
