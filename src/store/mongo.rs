//! MongoDB-backed store
//!
//! Reference lists change only through `$addToSet` / `$pull`, and event
//! attendance flips through a single pipeline update, so concurrent writers
//! never lose each other's ids.

use bson::{doc, Bson, Document};

use crate::db::schemas::{
    Child, ChildKind, ChildPatch, EventDoc, GardenDoc, GardenList, MessageCursor, MessageDoc,
    PlantDoc, TaskDoc, UserDoc, EVENT_COLLECTION, GARDEN_COLLECTION, MESSAGE_COLLECTION,
    PLANT_COLLECTION, TASK_COLLECTION, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::store::GardenStore;
use crate::types::{Id, Result, Timestamp};

pub struct MongoStore {
    gardens: MongoCollection<GardenDoc>,
    plants: MongoCollection<PlantDoc>,
    tasks: MongoCollection<TaskDoc>,
    events: MongoCollection<EventDoc>,
    messages: MongoCollection<MessageDoc>,
    users: MongoCollection<UserDoc>,
}

impl MongoStore {
    /// Open every collection, creating indexes as needed
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            gardens: mongo.collection(GARDEN_COLLECTION).await?,
            plants: mongo.collection(PLANT_COLLECTION).await?,
            tasks: mongo.collection(TASK_COLLECTION).await?,
            events: mongo.collection(EVENT_COLLECTION).await?,
            messages: mongo.collection(MESSAGE_COLLECTION).await?,
            users: mongo.collection(USER_COLLECTION).await?,
        })
    }
}

fn by_id(id: &Id) -> Document {
    doc! { "_id": id }
}

/// Account ids may be stored as ObjectIds or as hex strings
fn user_id_forms(ids: &[Id]) -> Vec<Bson> {
    ids.iter()
        .flat_map(|id| {
            let oid = id.object_id().map(Bson::ObjectId);
            std::iter::once(Bson::from(id)).chain(oid)
        })
        .collect()
}

fn listing_sort(kind: ChildKind) -> Document {
    match kind {
        ChildKind::Event => doc! { "date": 1, "_id": 1 },
        _ => newest_first(),
    }
}

fn newest_first() -> Document {
    doc! { "createdAt": -1, "_id": -1 }
}

#[async_trait::async_trait]
impl GardenStore for MongoStore {
    async fn insert_garden(&self, garden: &GardenDoc) -> Result<()> {
        self.gardens.insert_one(garden).await
    }

    async fn find_garden(&self, id: &Id) -> Result<Option<GardenDoc>> {
        self.gardens.find_one(by_id(id)).await
    }

    async fn list_gardens(&self) -> Result<Vec<GardenDoc>> {
        self.gardens
            .find_many(doc! {}, Some(doc! { "createdAt": 1, "_id": 1 }), None)
            .await
    }

    async fn gardens_for_user(&self, user: &Id) -> Result<Vec<GardenDoc>> {
        let filter = doc! { "$or": [ { "owner": user }, { "members": user } ] };
        self.gardens
            .find_many(filter, Some(doc! { "createdAt": 1, "_id": 1 }), None)
            .await
    }

    async fn gardens_owned_by(&self, user: &Id) -> Result<Vec<GardenDoc>> {
        self.gardens
            .find_many(doc! { "owner": user }, Some(doc! { "createdAt": 1, "_id": 1 }), None)
            .await
    }

    async fn delete_garden(&self, id: &Id) -> Result<bool> {
        self.gardens.delete_one(by_id(id)).await
    }

    async fn add_to_list(&self, garden: &Id, list: GardenList, id: &Id) -> Result<bool> {
        let update = doc! {
            "$addToSet": { list.field(): id },
            "$set": { "updatedAt": Timestamp::now().to_string() },
        };
        self.gardens.update_one(by_id(garden), update).await
    }

    async fn remove_from_list(&self, garden: &Id, list: GardenList, id: &Id) -> Result<bool> {
        let update = doc! {
            "$pull": { list.field(): id },
            "$set": { "updatedAt": Timestamp::now().to_string() },
        };
        self.gardens.update_one(by_id(garden), update).await
    }

    async fn insert_child(&self, child: &Child) -> Result<()> {
        match child {
            Child::Plant(p) => self.plants.insert_one(p).await,
            Child::Task(t) => self.tasks.insert_one(t).await,
            Child::Event(e) => self.events.insert_one(e).await,
        }
    }

    async fn find_child(&self, kind: ChildKind, id: &Id) -> Result<Option<Child>> {
        Ok(match kind {
            ChildKind::Plant => self.plants.find_one(by_id(id)).await?.map(Child::Plant),
            ChildKind::Task => self.tasks.find_one(by_id(id)).await?.map(Child::Task),
            ChildKind::Event => self.events.find_one(by_id(id)).await?.map(Child::Event),
        })
    }

    async fn update_child(&self, id: &Id, patch: &ChildPatch) -> Result<Option<Child>> {
        let update = doc! { "$set": patch.to_set_document(Timestamp::now())? };
        Ok(match patch.kind() {
            ChildKind::Plant => self
                .plants
                .find_one_and_update(by_id(id), update)
                .await?
                .map(Child::Plant),
            ChildKind::Task => self
                .tasks
                .find_one_and_update(by_id(id), update)
                .await?
                .map(Child::Task),
            ChildKind::Event => self
                .events
                .find_one_and_update(by_id(id), update)
                .await?
                .map(Child::Event),
        })
    }

    async fn delete_child(&self, kind: ChildKind, id: &Id) -> Result<bool> {
        match kind {
            ChildKind::Plant => self.plants.delete_one(by_id(id)).await,
            ChildKind::Task => self.tasks.delete_one(by_id(id)).await,
            ChildKind::Event => self.events.delete_one(by_id(id)).await,
        }
    }

    async fn children_of(&self, garden: &Id, kind: ChildKind) -> Result<Vec<Child>> {
        let filter = doc! { "garden": garden };
        let sort = Some(listing_sort(kind));
        Ok(match kind {
            ChildKind::Plant => self
                .plants
                .find_many(filter, sort, None)
                .await?
                .into_iter()
                .map(Child::Plant)
                .collect(),
            ChildKind::Task => self
                .tasks
                .find_many(filter, sort, None)
                .await?
                .into_iter()
                .map(Child::Task)
                .collect(),
            ChildKind::Event => self
                .events
                .find_many(filter, sort, None)
                .await?
                .into_iter()
                .map(Child::Event)
                .collect(),
        })
    }

    async fn delete_children_of(&self, garden: &Id, kind: ChildKind) -> Result<u64> {
        let filter = doc! { "garden": garden };
        match kind {
            ChildKind::Plant => self.plants.delete_many(filter).await,
            ChildKind::Task => self.tasks.delete_many(filter).await,
            ChildKind::Event => self.events.delete_many(filter).await,
        }
    }

    async fn recent_children(&self, kind: ChildKind, limit: usize) -> Result<Vec<Child>> {
        let sort = Some(newest_first());
        let limit = Some(limit as i64);
        Ok(match kind {
            ChildKind::Plant => self
                .plants
                .find_many(doc! {}, sort, limit)
                .await?
                .into_iter()
                .map(Child::Plant)
                .collect(),
            ChildKind::Task => self
                .tasks
                .find_many(doc! {}, sort, limit)
                .await?
                .into_iter()
                .map(Child::Task)
                .collect(),
            ChildKind::Event => self
                .events
                .find_many(doc! {}, sort, limit)
                .await?
                .into_iter()
                .map(Child::Event)
                .collect(),
        })
    }

    async fn toggle_attendee(&self, event: &Id, user: &Id) -> Result<Option<EventDoc>> {
        let user = Bson::from(user);
        let attendees = doc! { "$ifNull": ["$attendees", []] };
        let pipeline = vec![doc! {
            "$set": {
                "attendees": {
                    "$cond": [
                        { "$in": [user.clone(), attendees.clone()] },
                        { "$filter": {
                            "input": attendees.clone(),
                            "cond": { "$ne": ["$$this", user.clone()] },
                        } },
                        { "$concatArrays": [attendees, [user]] },
                    ]
                },
                "updatedAt": Timestamp::now().to_string(),
            }
        }];
        self.events.find_one_and_update(by_id(event), pipeline).await
    }

    async fn insert_message(&self, message: &MessageDoc) -> Result<()> {
        self.messages.insert_one(message).await
    }

    async fn messages_for(
        &self,
        garden: &Id,
        cursor: Option<&MessageCursor>,
    ) -> Result<Vec<MessageDoc>> {
        let mut filter = doc! { "garden": garden };
        if let Some(cursor) = cursor {
            for (key, value) in cursor.filter() {
                filter.insert(key, value);
            }
        }
        self.messages
            .find_many(filter, Some(doc! { "createdAt": 1, "_id": 1 }), None)
            .await
    }

    async fn delete_messages_of(&self, garden: &Id) -> Result<u64> {
        self.messages.delete_many(doc! { "garden": garden }).await
    }

    async fn find_users(&self, ids: &[Id]) -> Result<Vec<UserDoc>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.users
            .find_many(doc! { "_id": { "$in": user_id_forms(ids) } }, None, None)
            .await
    }
}
