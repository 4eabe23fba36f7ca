//! Database schemas for gardenhub
//!
//! Defines MongoDB document structures for gardens, their child entities,
//! chat messages and the read-only user directory.

mod child;
mod event;
mod garden;
mod message;
mod metadata;
mod plant;
mod task;
mod user;

pub use child::{Child, ChildKind, ChildPatch, ChildView, NewChild};
pub use event::{EventDoc, EventPatch, EventStatus, EventType, NewEvent, EVENT_COLLECTION};
pub use garden::{
    GardenCategory, GardenDoc, GardenList, GardenSummary, NewGarden, GARDEN_COLLECTION,
};
pub use message::{MessageCursor, MessageDoc, MessageView, NewMessage, MESSAGE_COLLECTION};
pub use metadata::Metadata;
pub use plant::{NewPlant, PlantDoc, PlantHealth, PlantPatch, PlantStatus, PLANT_COLLECTION};
pub use task::{NewTask, TaskDoc, TaskPatch, TaskPriority, TaskStatus, TaskType, TASK_COLLECTION};
pub use user::{UserDoc, UserRef, UserSummary, USER_COLLECTION};
