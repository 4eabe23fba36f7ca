//! Task status rules
//!
//! Any status can be assigned from any other. Assigning `completed` stamps
//! `completedDate` with the current time, including when the task was
//! already completed. Moving away from `completed` leaves the stamp in place.

use serde::Deserialize;

use crate::db::schemas::{TaskPatch, TaskStatus};
use crate::types::{GardenError, Result, Timestamp};

/// Body of the dedicated status endpoint
#[derive(Deserialize, Debug, Default)]
pub struct StatusChange {
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl StatusChange {
    pub fn into_patch(self, now: Timestamp) -> Result<TaskPatch> {
        let status = self
            .status
            .ok_or_else(|| GardenError::invalid("status", "Status is required"))?;
        let mut patch = TaskPatch {
            status: Some(status),
            ..Default::default()
        };
        stamp_completion(&mut patch, now);
        Ok(patch)
    }
}

/// Completion stamp for a task entering `status`
pub fn completion_stamp(status: TaskStatus, now: Timestamp) -> Option<Timestamp> {
    (status == TaskStatus::Completed).then_some(now)
}

/// Fill `completed_date` on a patch that assigns `completed`
pub fn stamp_completion(patch: &mut TaskPatch, now: Timestamp) {
    if let Some(stamp) = patch.status.and_then(|s| completion_stamp(s, now)) {
        patch.completed_date = Some(stamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{NewTask, TaskType};
    use crate::types::Id;

    fn at(raw: &str) -> Timestamp {
        Timestamp::parse(raw).unwrap()
    }

    #[test]
    fn test_completing_sets_date() {
        let patch = StatusChange {
            status: Some(TaskStatus::Completed),
        }
        .into_patch(at("2024-06-01T08:00:00Z"))
        .unwrap();
        assert_eq!(patch.completed_date, Some(at("2024-06-01T08:00:00Z")));
    }

    #[test]
    fn test_other_statuses_leave_date_alone() {
        for status in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Cancelled] {
            let patch = StatusChange { status: Some(status) }
                .into_patch(Timestamp::now())
                .unwrap();
            assert!(patch.completed_date.is_none());
        }
    }

    #[test]
    fn test_missing_status_is_invalid() {
        let err = StatusChange::default().into_patch(Timestamp::now()).unwrap_err();
        assert!(matches!(err, GardenError::Validation(_)));
    }

    #[test]
    fn test_reopening_keeps_completed_date() {
        let mut task = NewTask {
            title: "Harvest beans".into(),
            task_type: Some(TaskType::Harvesting),
            ..Default::default()
        }
        .into_doc(Id::new(), Id::new(), None);

        let first = at("2024-06-01T08:00:00Z");
        let mut done = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        stamp_completion(&mut done, first);
        done.apply(&mut task);
        assert_eq!(task.completed_date, Some(first));

        let mut reopen = TaskPatch {
            status: Some(TaskStatus::Pending),
            ..Default::default()
        };
        stamp_completion(&mut reopen, at("2024-06-02T08:00:00Z"));
        reopen.apply(&mut task);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.completed_date, Some(first));

        let second = at("2024-06-03T08:00:00Z");
        let mut again = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        stamp_completion(&mut again, second);
        again.apply(&mut task);
        assert_eq!(task.completed_date, Some(second));
    }
}
