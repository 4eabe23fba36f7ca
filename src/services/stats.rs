//! Garden statistics
//!
//! Derived on every read from the live child collections; nothing here is
//! stored.

use serde::Serialize;

use crate::db::schemas::{EventDoc, EventStatus, GardenDoc, PlantDoc, TaskDoc, TaskStatus};
use crate::types::Timestamp;

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GardenStats {
    pub total_members: usize,
    /// No separate activity signal exists; mirrors `total_members`
    pub active_members: usize,
    pub total_plants: usize,
    pub upcoming_events: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
}

impl GardenStats {
    /// Fold a garden's children into counts as of `now`
    pub fn compute(
        garden: &GardenDoc,
        plants: &[PlantDoc],
        events: &[EventDoc],
        tasks: &[TaskDoc],
        now: Timestamp,
    ) -> Self {
        let members = garden.members.len();
        Self {
            total_members: members,
            active_members: members,
            total_plants: plants.iter().filter(|p| p.garden == garden.id).count(),
            upcoming_events: events
                .iter()
                .filter(|e| e.garden == garden.id)
                .filter(|e| e.status == EventStatus::Upcoming && e.date > now)
                .count(),
            completed_tasks: tasks
                .iter()
                .filter(|t| t.garden == garden.id && t.status == TaskStatus::Completed)
                .count(),
            pending_tasks: tasks
                .iter()
                .filter(|t| t.garden == garden.id && t.status == TaskStatus::Pending)
                .count(),
        }
    }
}
