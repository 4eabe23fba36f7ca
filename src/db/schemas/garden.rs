//! Garden document schema
//!
//! The garden is the aggregate root. It owns four reference lists; the child
//! documents carry the back-reference. The lists are kept in step with the
//! children by `services::gardens`, never by callers touching both sides.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;
use crate::types::{FieldError, GardenError, Id, Timestamp};

/// Collection name for gardens
pub const GARDEN_COLLECTION: &str = "gardens";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GardenCategory {
    #[default]
    Community,
    Urban,
    School,
    Therapeutic,
    Rooftop,
    Vertical,
}

/// One of the garden's reference lists
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GardenList {
    Members,
    Plants,
    Tasks,
    Events,
}

impl GardenList {
    /// Document field holding this list
    pub fn field(&self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::Plants => "plants",
            Self::Tasks => "tasks",
            Self::Events => "events",
        }
    }
}

/// Garden document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GardenDoc {
    #[serde(rename = "_id")]
    pub id: Id,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub location: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate: Option<String>,

    #[serde(default)]
    pub category: GardenCategory,

    /// Creator; immutable after creation
    pub owner: Id,

    #[serde(default)]
    pub members: Vec<Id>,

    #[serde(default)]
    pub plants: Vec<Id>,

    #[serde(default)]
    pub tasks: Vec<Id>,

    #[serde(default)]
    pub events: Vec<Id>,

    #[serde(flatten)]
    pub metadata: Metadata,
}

impl GardenDoc {
    pub fn list(&self, list: GardenList) -> &[Id] {
        match list {
            GardenList::Members => &self.members,
            GardenList::Plants => &self.plants,
            GardenList::Tasks => &self.tasks,
            GardenList::Events => &self.events,
        }
    }

    pub fn list_mut(&mut self, list: GardenList) -> &mut Vec<Id> {
        match list {
            GardenList::Members => &mut self.members,
            GardenList::Plants => &mut self.plants,
            GardenList::Tasks => &mut self.tasks,
            GardenList::Events => &mut self.events,
        }
    }

    pub fn is_member(&self, user: &Id) -> bool {
        self.members.contains(user)
    }
}

impl IntoIndexes for GardenDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "owner": 1 },
                Some(IndexOptions::builder().name("owner_index".to_string()).build()),
            ),
            (
                doc! { "members": 1 },
                Some(IndexOptions::builder().name("members_index".to_string()).build()),
            ),
        ]
    }
}

/// Input for creating a garden
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewGarden {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub soil_type: Option<String>,
    #[serde(default)]
    pub climate: Option<String>,
    #[serde(default)]
    pub category: Option<GardenCategory>,
}

impl NewGarden {
    pub fn validate(&self) -> Result<(), GardenError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Name is required"));
        }
        if self.description.trim().is_empty() {
            errors.push(FieldError::new("description", "Description is required"));
        }
        if self.location.trim().is_empty() {
            errors.push(FieldError::new("location", "Location is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GardenError::Validation(errors))
        }
    }

    /// Build the document; the owner is the first member
    pub fn into_doc(self, owner: Id) -> GardenDoc {
        GardenDoc {
            id: Id::new(),
            name: self.name,
            description: self.description,
            location: self.location,
            size: self.size,
            soil_type: self.soil_type,
            climate: self.climate,
            category: self.category.unwrap_or_default(),
            members: vec![owner.clone()],
            owner,
            plants: Vec::new(),
            tasks: Vec::new(),
            events: Vec::new(),
            metadata: Metadata::new(),
        }
    }
}

/// Listing row for the garden directory
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GardenSummary {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub description: String,
    pub location: String,
    pub category: GardenCategory,
    pub owner: Id,
    pub created_at: Timestamp,
    pub member_count: usize,
}

impl From<&GardenDoc> for GardenSummary {
    fn from(garden: &GardenDoc) -> Self {
        Self {
            id: garden.id.clone(),
            name: garden.name.clone(),
            description: garden.description.clone(),
            location: garden.location.clone(),
            category: garden.category,
            owner: garden.owner.clone(),
            created_at: garden.metadata.created_at,
            member_count: garden.members.len(),
        }
    }
}
