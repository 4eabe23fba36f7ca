//! Task document schema
//!
//! Status changes go through `services::tasks`, which stamps
//! `completedDate` when a task enters `completed`.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;
use crate::types::{form, time, FieldError, GardenError, Id, Timestamp};

/// Collection name for tasks
pub const TASK_COLLECTION: &str = "tasks";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Watering,
    Fertilizing,
    Pruning,
    Harvesting,
    Planting,
    #[default]
    Maintenance,
    Other,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDoc {
    #[serde(rename = "_id")]
    pub id: Id,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type", default)]
    pub task_type: TaskType,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Id>,

    pub assigned_by: Id,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Timestamp>,

    /// Set on entering `completed`; never cleared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<Timestamp>,

    /// Parent garden
    pub garden: Id,

    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u32>,

    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(flatten)]
    pub metadata: Metadata,
}

impl IntoIndexes for TaskDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "garden": 1, "createdAt": -1 },
                Some(
                    IndexOptions::builder()
                        .name("garden_created_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "assignedTo": 1 },
                Some(
                    IndexOptions::builder()
                        .name("assigned_to_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

/// Input for adding a task to a garden
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "form::optional_text")]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub task_type: Option<TaskType>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "form::optional_id")]
    pub assigned_to: Option<Id>,
    #[serde(default, deserialize_with = "time::optional")]
    pub due_date: Option<Timestamp>,
    #[serde(default)]
    pub estimated_duration: Option<u32>,
    #[serde(default)]
    pub actual_duration: Option<u32>,
    #[serde(default, deserialize_with = "form::optional_text")]
    pub notes: Option<String>,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), GardenError> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "Task title is required"));
        }
        if self.task_type.is_none() {
            errors.push(FieldError::new("type", "Task type is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GardenError::Validation(errors))
        }
    }

    /// Build the document. `completed_date` is supplied by the status
    /// state machine when the task is created already completed.
    pub fn into_doc(
        self,
        garden: Id,
        assigned_by: Id,
        completed_date: Option<Timestamp>,
    ) -> TaskDoc {
        TaskDoc {
            id: Id::new(),
            title: self.title,
            description: self.description,
            task_type: self.task_type.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            assigned_to: self.assigned_to,
            assigned_by,
            due_date: self.due_date,
            completed_date,
            garden,
            estimated_duration: self.estimated_duration,
            actual_duration: self.actual_duration,
            notes: self.notes,
            metadata: Metadata::new(),
        }
    }
}

/// Partial update; the parent garden and assigner cannot be changed
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "form::optional_text")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "form::optional_id")]
    pub assigned_to: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "time::optional")]
    pub due_date: Option<Timestamp>,
    /// Derived from `status`; not accepted from clients
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "form::optional_text")]
    pub notes: Option<String>,
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), GardenError> {
        if matches!(self.title.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(GardenError::invalid("title", "Task title cannot be empty"));
        }
        Ok(())
    }

    pub fn apply(&self, task: &mut TaskDoc) {
        if let Some(v) = &self.title {
            task.title = v.clone();
        }
        if let Some(v) = &self.description {
            task.description = Some(v.clone());
        }
        if let Some(v) = self.task_type {
            task.task_type = v;
        }
        if let Some(v) = self.priority {
            task.priority = v;
        }
        if let Some(v) = self.status {
            task.status = v;
        }
        if let Some(v) = &self.assigned_to {
            task.assigned_to = Some(v.clone());
        }
        if let Some(v) = self.due_date {
            task.due_date = Some(v);
        }
        if let Some(v) = self.completed_date {
            task.completed_date = Some(v);
        }
        if let Some(v) = self.estimated_duration {
            task.estimated_duration = Some(v);
        }
        if let Some(v) = self.actual_duration {
            task.actual_duration = Some(v);
        }
        if let Some(v) = &self.notes {
            task.notes = Some(v.clone());
        }
        task.metadata.touch();
    }
}
