//! Recent activity across all gardens

use serde::Serialize;
use std::sync::Arc;

use crate::db::schemas::{Child, ChildKind};
use crate::store::GardenStore;
use crate::types::Result;

/// How many of each kind are considered
const PER_KIND: usize = 5;

/// How many entries the feed returns
const FEED_LEN: usize = 10;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ActivityEntry {
    pub kind: ChildKind,
    #[serde(flatten)]
    pub item: Child,
}

#[derive(Clone)]
pub struct ActivityService {
    store: Arc<dyn GardenStore>,
}

impl ActivityService {
    pub fn new(store: Arc<dyn GardenStore>) -> Self {
        Self { store }
    }

    /// Newest plants, tasks and events merged, newest first
    pub async fn recent(&self) -> Result<Vec<ActivityEntry>> {
        let (events, plants, tasks) = futures::try_join!(
            self.store.recent_children(ChildKind::Event, PER_KIND),
            self.store.recent_children(ChildKind::Plant, PER_KIND),
            self.store.recent_children(ChildKind::Task, PER_KIND),
        )?;

        let mut feed: Vec<ActivityEntry> = events
            .into_iter()
            .chain(plants)
            .chain(tasks)
            .map(|item| ActivityEntry {
                kind: item.kind(),
                item,
            })
            .collect();
        feed.sort_by(|a, b| {
            (b.item.created_at(), b.item.id()).cmp(&(a.item.created_at(), a.item.id()))
        });
        feed.truncate(FEED_LEN);
        Ok(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{NewEvent, NewPlant, NewTask, TaskType};
    use crate::store::MemoryStore;
    use crate::types::{Id, Timestamp};

    #[tokio::test]
    async fn test_feed_is_capped_and_tagged() {
        let store = Arc::new(MemoryStore::new());
        let garden = Id::new();
        let user = Id::new();
        for i in 0..7 {
            let plant = NewPlant {
                name: format!("Plant {i}"),
                species: "Solanum".into(),
                ..Default::default()
            };
            store
                .insert_child(&Child::Plant(plant.into_doc(garden.clone(), user.clone())))
                .await
                .unwrap();
            let task = NewTask {
                title: format!("Task {i}"),
                task_type: Some(TaskType::Watering),
                ..Default::default()
            };
            store
                .insert_child(&Child::Task(task.into_doc(garden.clone(), user.clone(), None)))
                .await
                .unwrap();
        }
        let event = NewEvent {
            title: "Harvest party".into(),
            date: Timestamp::parse("2030-09-01"),
            ..Default::default()
        };
        store
            .insert_child(&Child::Event(event.into_doc(garden.clone(), user.clone())))
            .await
            .unwrap();

        let feed = ActivityService::new(store).recent().await.unwrap();
        assert_eq!(feed.len(), FEED_LEN);
        assert!(feed.iter().any(|e| e.kind == ChildKind::Event));
        assert!(feed.iter().filter(|e| e.kind == ChildKind::Plant).count() <= PER_KIND);

        let json = serde_json::to_value(&feed[0]).unwrap();
        assert!(json.get("kind").is_some());
        assert!(json.get("_id").is_some());
    }
}
