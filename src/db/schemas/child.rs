//! Child entities of a garden, addressed by kind
//!
//! Plants, tasks and events live in their own collections and point back at
//! their garden. These wrappers let the aggregate code treat them uniformly.

use bson::Document;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::db::schemas::{
    EventDoc, EventPatch, GardenList, NewEvent, NewPlant, NewTask, PlantDoc, PlantPatch, TaskDoc,
    TaskPatch, UserDoc, UserRef,
};
use crate::types::{GardenError, Id, Result, Timestamp};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChildKind {
    Plant,
    Task,
    Event,
}

impl ChildKind {
    pub const ALL: [ChildKind; 3] = [ChildKind::Plant, ChildKind::Task, ChildKind::Event];

    /// The garden list that references children of this kind
    pub fn list(&self) -> GardenList {
        match self {
            Self::Plant => GardenList::Plants,
            Self::Task => GardenList::Tasks,
            Self::Event => GardenList::Events,
        }
    }

    /// Capitalized name for messages, e.g. "Plant not found"
    pub fn label(&self) -> &'static str {
        match self {
            Self::Plant => "Plant",
            Self::Task => "Task",
            Self::Event => "Event",
        }
    }

    pub fn not_found(&self) -> GardenError {
        GardenError::NotFound(format!("{} not found", self.label()))
    }
}

/// A stored child entity of any kind
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Child {
    Plant(PlantDoc),
    Task(TaskDoc),
    Event(EventDoc),
}

impl Child {
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::Plant(_) => ChildKind::Plant,
            Self::Task(_) => ChildKind::Task,
            Self::Event(_) => ChildKind::Event,
        }
    }

    pub fn id(&self) -> &Id {
        match self {
            Self::Plant(p) => &p.id,
            Self::Task(t) => &t.id,
            Self::Event(e) => &e.id,
        }
    }

    /// Parent garden
    pub fn garden(&self) -> &Id {
        match self {
            Self::Plant(p) => &p.garden,
            Self::Task(t) => &t.garden,
            Self::Event(e) => &e.garden,
        }
    }

    /// plantedBy / assignedBy / createdBy
    pub fn creator(&self) -> &Id {
        match self {
            Self::Plant(p) => &p.planted_by,
            Self::Task(t) => &t.assigned_by,
            Self::Event(e) => &e.created_by,
        }
    }

    /// Every user id the child names, creator first
    pub fn people(&self) -> Vec<&Id> {
        match self {
            Self::Plant(p) => vec![&p.planted_by],
            Self::Task(t) => std::iter::once(&t.assigned_by)
                .chain(t.assigned_to.as_ref())
                .collect(),
            Self::Event(e) => std::iter::once(&e.created_by)
                .chain(e.attendees.iter())
                .collect(),
        }
    }

    pub fn created_at(&self) -> Timestamp {
        match self {
            Self::Plant(p) => p.metadata.created_at,
            Self::Task(t) => t.metadata.created_at,
            Self::Event(e) => e.metadata.created_at,
        }
    }

    pub fn into_plant(self) -> Option<PlantDoc> {
        match self {
            Self::Plant(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_task(self) -> Option<TaskDoc> {
        match self {
            Self::Task(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_event(self) -> Option<EventDoc> {
        match self {
            Self::Event(e) => Some(e),
            _ => None,
        }
    }
}

/// Creation input for a child of any kind
#[derive(Clone, Debug)]
pub enum NewChild {
    Plant(NewPlant),
    Task(NewTask),
    Event(NewEvent),
}

impl NewChild {
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::Plant(_) => ChildKind::Plant,
            Self::Task(_) => ChildKind::Task,
            Self::Event(_) => ChildKind::Event,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Plant(p) => p.validate(),
            Self::Task(t) => t.validate(),
            Self::Event(e) => e.validate(),
        }
    }
}

/// Partial update for a child of any kind
#[derive(Clone, Debug, PartialEq)]
pub enum ChildPatch {
    Plant(PlantPatch),
    Task(TaskPatch),
    Event(EventPatch),
}

impl ChildPatch {
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::Plant(_) => ChildKind::Plant,
            Self::Task(_) => ChildKind::Task,
            Self::Event(_) => ChildKind::Event,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Plant(p) => p.validate(),
            Self::Task(t) => t.validate(),
            Self::Event(e) => e.validate(),
        }
    }

    /// `$set` body for the patched fields plus `updatedAt`
    pub fn to_set_document(&self, now: Timestamp) -> Result<Document> {
        let mut set = match self {
            Self::Plant(p) => bson::to_document(p)?,
            Self::Task(t) => bson::to_document(t)?,
            Self::Event(e) => bson::to_document(e)?,
        };
        set.insert("updatedAt", now.to_string());
        Ok(set)
    }
}

/// A child as listed, with `plantedBy`, `assignedTo`/`assignedBy` or
/// `createdBy`/`attendees` resolved to user summaries
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct ChildView(Map<String, Value>);

impl ChildView {
    pub fn new(child: &Child, users: &[UserDoc]) -> Result<Self> {
        let encode_err = |e: serde_json::Error| GardenError::Internal(format!("child encode failed: {}", e));
        let resolve = |id: &Id| serde_json::to_value(UserRef::resolve(id, users)).map_err(encode_err);

        let mut fields = match serde_json::to_value(child).map_err(encode_err)? {
            Value::Object(fields) => fields,
            other => {
                return Err(GardenError::Internal(format!(
                    "{} encoded as {}",
                    child.kind().label(),
                    other
                )))
            }
        };

        match child {
            Child::Plant(p) => {
                fields.insert("plantedBy".into(), resolve(&p.planted_by)?);
            }
            Child::Task(t) => {
                fields.insert("assignedBy".into(), resolve(&t.assigned_by)?);
                if let Some(to) = &t.assigned_to {
                    fields.insert("assignedTo".into(), resolve(to)?);
                }
            }
            Child::Event(e) => {
                fields.insert("createdBy".into(), resolve(&e.created_by)?);
                let attendees = e.attendees.iter().map(resolve).collect::<Result<Vec<_>>>()?;
                fields.insert("attendees".into(), Value::Array(attendees));
            }
        }
        Ok(Self(fields))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}
