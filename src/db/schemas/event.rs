//! Event document schema
//!
//! Attendance is a toggle on `attendees`; `maxAttendees` is informational
//! and not enforced.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;
use crate::types::{form, time, FieldError, GardenError, Id, Timestamp};

/// Collection name for events
pub const EVENT_COLLECTION: &str = "events";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    #[default]
    Workday,
    Workshop,
    Harvest,
    Celebration,
    Maintenance,
    Other,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDoc {
    #[serde(rename = "_id")]
    pub id: Id,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub date: Timestamp,

    /// Free-form start time as entered, e.g. "09:30"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,

    #[serde(rename = "type", default)]
    pub event_type: EventType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attendees: Option<u32>,

    #[serde(default)]
    pub attendees: Vec<Id>,

    /// Parent garden
    pub garden: Id,

    pub created_by: Id,

    #[serde(default)]
    pub status: EventStatus,

    #[serde(flatten)]
    pub metadata: Metadata,
}

impl EventDoc {
    /// Join if absent, leave if present. Returns whether the user now attends.
    pub fn toggle_attendee(&mut self, user: &Id) -> bool {
        if let Some(pos) = self.attendees.iter().position(|a| a == user) {
            self.attendees.remove(pos);
            false
        } else {
            self.attendees.push(user.clone());
            true
        }
    }
}

impl IntoIndexes for EventDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "garden": 1, "date": 1 },
            Some(
                IndexOptions::builder()
                    .name("garden_date_index".to_string())
                    .build(),
            ),
        )]
    }
}

/// Input for scheduling an event in a garden
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "form::optional_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "time::optional")]
    pub date: Option<Timestamp>,
    #[serde(default, deserialize_with = "form::optional_text")]
    pub time: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(rename = "type", default)]
    pub event_type: Option<EventType>,
    #[serde(default, deserialize_with = "form::optional_text")]
    pub location: Option<String>,
    #[serde(default)]
    pub max_attendees: Option<u32>,
    #[serde(default)]
    pub status: Option<EventStatus>,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), GardenError> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "Event title is required"));
        }
        if self.date.is_none() {
            errors.push(FieldError::new("date", "Event date is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GardenError::Validation(errors))
        }
    }

    /// Build the document; the creator is the first attendee
    pub fn into_doc(self, garden: Id, created_by: Id) -> EventDoc {
        EventDoc {
            id: Id::new(),
            title: self.title,
            description: self.description,
            date: self.date.unwrap_or_else(Timestamp::now),
            time: self.time,
            duration: self.duration,
            event_type: self.event_type.unwrap_or_default(),
            location: self.location,
            max_attendees: self.max_attendees,
            attendees: vec![created_by.clone()],
            garden,
            created_by,
            status: self.status.unwrap_or_default(),
            metadata: Metadata::new(),
        }
    }
}

/// Partial update; garden, creator and attendees cannot be changed here
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "form::optional_text")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "time::optional")]
    pub date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "form::optional_text")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "form::optional_text")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attendees: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
}

impl EventPatch {
    pub fn validate(&self) -> Result<(), GardenError> {
        if matches!(self.title.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(GardenError::invalid("title", "Event title cannot be empty"));
        }
        Ok(())
    }

    pub fn apply(&self, event: &mut EventDoc) {
        if let Some(v) = &self.title {
            event.title = v.clone();
        }
        if let Some(v) = &self.description {
            event.description = Some(v.clone());
        }
        if let Some(v) = self.date {
            event.date = v;
        }
        if let Some(v) = &self.time {
            event.time = Some(v.clone());
        }
        if let Some(v) = self.duration {
            event.duration = Some(v);
        }
        if let Some(v) = self.event_type {
            event.event_type = v;
        }
        if let Some(v) = &self.location {
            event.location = Some(v.clone());
        }
        if let Some(v) = self.max_attendees {
            event.max_attendees = Some(v);
        }
        if let Some(v) = self.status {
            event.status = v;
        }
        event.metadata.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(creator: &Id) -> EventDoc {
        NewEvent {
            title: "Spring Planting Day".into(),
            date: Timestamp::parse("2030-04-01"),
            ..Default::default()
        }
        .into_doc(Id::new(), creator.clone())
    }

    #[test]
    fn test_creator_attends() {
        let creator = Id::new();
        let event = sample(&creator);
        assert_eq!(event.attendees, vec![creator]);
        assert_eq!(event.status, EventStatus::Upcoming);
    }

    #[test]
    fn test_toggle_attendee() {
        let creator = Id::new();
        let other = Id::new();
        let mut event = sample(&creator);

        assert!(event.toggle_attendee(&other));
        assert_eq!(event.attendees, vec![creator.clone(), other.clone()]);

        assert!(!event.toggle_attendee(&other));
        assert_eq!(event.attendees, vec![creator.clone()]);

        // creator has no special protection
        assert!(!event.toggle_attendee(&creator));
        assert!(event.attendees.is_empty());
    }

    #[test]
    fn test_title_and_date_required() {
        let input: NewEvent =
            serde_json::from_str(r#"{"title":"Harvest","date":"","time":""}"#).unwrap();
        let err = input.validate().unwrap_err();
        assert!(matches!(err, GardenError::Validation(ref f) if f[0].field == "date"));
        assert!(input.time.is_none());
    }
}
