//! Garden aggregate
//!
//! A garden's `plants`, `tasks` and `events` lists must name exactly the
//! children whose `garden` field points back at it. Every child write that
//! can affect that goes through `GardenService`.
//!
//! Child rows are authoritative. If a list and the child collections ever
//! disagree, `verify_integrity` reports the drift and `repair` rebuilds the
//! lists from a live scan.
//!
//! Operations that write more than one document run on their own task. A
//! request that times out or loses its client stops waiting for the result,
//! but the writes and any rollback still run to the end.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::db::schemas::{
    Child, ChildKind, ChildPatch, ChildView, EventDoc, GardenCategory, GardenDoc, GardenList,
    GardenSummary, Metadata, NewChild, NewGarden, TaskDoc, UserDoc, UserRef,
};
use crate::services::stats::GardenStats;
use crate::services::tasks::{self, StatusChange};
use crate::store::GardenStore;
use crate::types::{GardenError, Id, Result, Timestamp};

/// A garden with its owner and members resolved
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GardenView {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub description: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub climate: Option<String>,
    pub category: GardenCategory,
    pub owner: UserRef,
    pub members: Vec<UserRef>,
    pub plants: Vec<Id>,
    pub tasks: Vec<Id>,
    pub events: Vec<Id>,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl GardenView {
    pub fn new(garden: GardenDoc, users: &[UserDoc]) -> Self {
        Self {
            owner: UserRef::resolve(&garden.owner, users),
            members: garden
                .members
                .iter()
                .map(|m| UserRef::resolve(m, users))
                .collect(),
            id: garden.id,
            name: garden.name,
            description: garden.description,
            location: garden.location,
            size: garden.size,
            soil_type: garden.soil_type,
            climate: garden.climate,
            category: garden.category,
            plants: garden.plants,
            tasks: garden.tasks,
            events: garden.events,
            metadata: garden.metadata,
        }
    }
}

/// A garden as shown on its detail page
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct GardenDetail {
    #[serde(flatten)]
    pub garden: GardenView,
    pub stats: GardenStats,
}

/// Drift between one garden list and the child collection it mirrors
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ListReport {
    pub kind: ChildKind,
    /// Children naming the garden that the list lacks
    pub missing: Vec<Id>,
    /// Listed ids with no child pointing back at the garden
    pub dangling: Vec<Id>,
    /// Ids listed more than once
    pub duplicated: Vec<Id>,
}

impl ListReport {
    fn compare(kind: ChildKind, listed: &[Id], live: &[Id]) -> Self {
        let live_set: HashSet<&Id> = live.iter().collect();
        let mut seen: HashMap<&Id, usize> = HashMap::new();
        for id in listed {
            *seen.entry(id).or_default() += 1;
        }

        let missing = live
            .iter()
            .filter(|id| !seen.contains_key(id))
            .cloned()
            .collect();

        let mut dangling = Vec::new();
        let mut duplicated = Vec::new();
        let mut reported = HashSet::new();
        for id in listed {
            if !reported.insert(id) {
                continue;
            }
            if !live_set.contains(id) {
                dangling.push(id.clone());
            } else if seen[id] > 1 {
                duplicated.push(id.clone());
            }
        }

        Self {
            kind,
            missing,
            dangling,
            duplicated,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.dangling.is_empty() && self.duplicated.is_empty()
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct IntegrityReport {
    pub garden: Id,
    pub consistent: bool,
    pub lists: Vec<ListReport>,
}

fn garden_not_found() -> GardenError {
    GardenError::NotFound("Garden not found".into())
}

fn not_authorized() -> GardenError {
    GardenError::Forbidden("Not authorized".into())
}

/// Build a child document for `garden`, applying creation-time rules
fn build_child(input: NewChild, garden: &Id, creator: &Id, now: Timestamp) -> Child {
    match input {
        NewChild::Plant(p) => Child::Plant(p.into_doc(garden.clone(), creator.clone())),
        NewChild::Task(t) => {
            let stamp = t
                .status
                .and_then(|status| tasks::completion_stamp(status, now));
            Child::Task(t.into_doc(garden.clone(), creator.clone(), stamp))
        }
        NewChild::Event(e) => Child::Event(e.into_doc(garden.clone(), creator.clone())),
    }
}

/// Run a multi-write unit on its own task and wait for it
async fn detached<T, F>(unit: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(unit)
        .await
        .map_err(|e| GardenError::Internal(format!("write task failed: {}", e)))?
}

#[derive(Clone)]
pub struct GardenService {
    store: Arc<dyn GardenStore>,
}

impl GardenService {
    pub fn new(store: Arc<dyn GardenStore>) -> Self {
        Self { store }
    }

    async fn load(&self, id: &Id) -> Result<GardenDoc> {
        self.store.find_garden(id).await?.ok_or_else(garden_not_found)
    }

    async fn view(&self, garden: GardenDoc) -> Result<GardenView> {
        let mut ids = garden.members.clone();
        if !ids.contains(&garden.owner) {
            ids.push(garden.owner.clone());
        }
        let users = self.store.find_users(&ids).await?;
        Ok(GardenView::new(garden, &users))
    }

    // ------------------------------------------------------------------
    // Gardens
    // ------------------------------------------------------------------

    /// Create a garden owned by `owner`, who becomes its only member
    pub async fn create(&self, owner: &Id, input: NewGarden) -> Result<GardenView> {
        input.validate()?;
        let garden = input.into_doc(owner.clone());
        self.store.insert_garden(&garden).await?;
        info!(garden = %garden.id, owner = %owner, "Garden created");
        self.view(garden).await
    }

    /// Garden with owner and members resolved plus live statistics
    pub async fn get_with_stats(&self, id: &Id) -> Result<GardenDetail> {
        let garden = self.load(id).await?;
        self.detail(garden, Timestamp::now()).await
    }

    async fn detail(&self, garden: GardenDoc, now: Timestamp) -> Result<GardenDetail> {
        let (plants, events, tasks) = futures::try_join!(
            self.store.children_of(&garden.id, ChildKind::Plant),
            self.store.children_of(&garden.id, ChildKind::Event),
            self.store.children_of(&garden.id, ChildKind::Task),
        )?;
        let plants: Vec<_> = plants.into_iter().filter_map(Child::into_plant).collect();
        let events: Vec<_> = events.into_iter().filter_map(Child::into_event).collect();
        let tasks: Vec<_> = tasks.into_iter().filter_map(Child::into_task).collect();

        let stats = GardenStats::compute(&garden, &plants, &events, &tasks, now);
        Ok(GardenDetail {
            garden: self.view(garden).await?,
            stats,
        })
    }

    pub async fn list(&self) -> Result<Vec<GardenSummary>> {
        let gardens = self.store.list_gardens().await?;
        Ok(gardens.iter().map(GardenSummary::from).collect())
    }

    /// Gardens the user owns or has joined
    pub async fn for_user(&self, user: &Id) -> Result<Vec<GardenDoc>> {
        self.store.gardens_for_user(user).await
    }

    pub async fn created_by(&self, user: &Id) -> Result<Vec<GardenDoc>> {
        self.store.gardens_owned_by(user).await
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Add the user to the garden's members; joining twice is a no-op
    pub async fn join(&self, garden: &Id, user: &Id) -> Result<GardenDoc> {
        if !self.store.add_to_list(garden, GardenList::Members, user).await? {
            return Err(garden_not_found());
        }
        debug!(garden = %garden, user = %user, "Joined garden");
        self.load(garden).await
    }

    /// Remove the user from the garden's members; leaving when absent is a
    /// no-op. The owner may leave and stays owner.
    pub async fn leave(&self, garden: &Id, user: &Id) -> Result<()> {
        if !self.store.remove_from_list(garden, GardenList::Members, user).await? {
            return Err(garden_not_found());
        }
        debug!(garden = %garden, user = %user, "Left garden");
        Ok(())
    }

    /// Delete a garden and everything in it. Owner only.
    ///
    /// The garden record goes first so it stops resolving at once; a
    /// concurrent `add_child` then fails its list append and rolls back.
    /// Child sweep failures are logged and do not undo the deletion.
    pub async fn delete_garden(&self, id: &Id, requester: &Id) -> Result<()> {
        let garden = self.load(id).await?;
        if &garden.owner != requester {
            return Err(not_authorized());
        }
        let service = self.clone();
        let id = id.clone();
        detached(async move { service.delete_and_sweep(id).await }).await
    }

    async fn delete_and_sweep(&self, id: Id) -> Result<()> {
        if !self.store.delete_garden(&id).await? {
            return Err(garden_not_found());
        }

        for kind in ChildKind::ALL {
            match self.store.delete_children_of(&id, kind).await {
                Ok(n) => debug!(garden = %id, kind = kind.label(), removed = n, "Swept children"),
                Err(e) => error!(garden = %id, kind = kind.label(), "Failed to sweep children: {}", e),
            }
        }
        if let Err(e) = self.store.delete_messages_of(&id).await {
            error!(garden = %id, "Failed to sweep messages: {}", e);
        }

        info!(garden = %id, "Garden deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Children
    // ------------------------------------------------------------------

    /// Create a child in `garden` and reference it from the garden's list.
    ///
    /// Either both writes land or the call fails. If the append cannot be
    /// made the inserted child is removed again.
    pub async fn add_child(&self, garden: &Id, input: NewChild, creator: &Id) -> Result<Child> {
        input.validate()?;
        self.load(garden).await?;

        let child = build_child(input, garden, creator, Timestamp::now());
        let service = self.clone();
        detached(async move { service.insert_and_attach(child).await }).await
    }

    async fn insert_and_attach(&self, child: Child) -> Result<Child> {
        let kind = child.kind();
        let garden = child.garden().clone();
        self.store.insert_child(&child).await?;

        match self.store.add_to_list(&garden, kind.list(), child.id()).await {
            Ok(true) => {
                debug!(garden = %garden, kind = kind.label(), child = %child.id(), "Child added");
                Ok(child)
            }
            Ok(false) => {
                self.roll_back(&child).await;
                Err(garden_not_found())
            }
            Err(e) => {
                self.roll_back(&child).await;
                Err(e)
            }
        }
    }

    async fn roll_back(&self, child: &Child) {
        let kind = child.kind();
        match self.store.delete_child(kind, child.id()).await {
            Ok(_) => warn!(
                garden = %child.garden(),
                kind = kind.label(),
                child = %child.id(),
                "Rolled back child after failed list append"
            ),
            Err(e) => error!(
                garden = %child.garden(),
                kind = kind.label(),
                child = %child.id(),
                "Rollback failed, garden needs repair: {}",
                e
            ),
        }
    }

    /// Delete a child and drop it from its garden's list
    pub async fn remove_child(&self, kind: ChildKind, id: &Id) -> Result<()> {
        let child = self.find_child(kind, id).await?;
        let service = self.clone();
        detached(async move { service.delete_and_detach(child).await }).await
    }

    async fn delete_and_detach(&self, child: Child) -> Result<()> {
        let (kind, id, garden) = (child.kind(), child.id(), child.garden());
        if !self.store.delete_child(kind, id).await? {
            return Err(kind.not_found());
        }
        // The garden may already be gone; that is fine.
        self.store.remove_from_list(garden, kind.list(), id).await?;
        debug!(garden = %garden, kind = kind.label(), child = %id, "Child removed");
        Ok(())
    }

    pub async fn find_child(&self, kind: ChildKind, id: &Id) -> Result<Child> {
        self.store
            .find_child(kind, id)
            .await?
            .ok_or_else(|| kind.not_found())
    }

    /// Children of a garden with the people they name resolved
    pub async fn list_children(&self, garden: &Id, kind: ChildKind) -> Result<Vec<ChildView>> {
        let children = self.store.children_of(garden, kind).await?;
        let mut people: Vec<Id> = children.iter().flat_map(Child::people).cloned().collect();
        people.sort();
        people.dedup();
        let users = self.store.find_users(&people).await?;
        children.iter().map(|c| ChildView::new(c, &users)).collect()
    }

    /// Apply a typed patch. Parent garden, creator and attendees are never
    /// touched by a patch.
    pub async fn update_child(&self, id: &Id, mut patch: ChildPatch) -> Result<Child> {
        patch.validate()?;
        if let ChildPatch::Task(task) = &mut patch {
            tasks::stamp_completion(task, Timestamp::now());
        }
        self.store
            .update_child(id, &patch)
            .await?
            .ok_or_else(|| patch.kind().not_found())
    }

    pub async fn set_task_status(&self, id: &Id, change: StatusChange) -> Result<TaskDoc> {
        let patch = change.into_patch(Timestamp::now())?;
        self.store
            .update_child(id, &ChildPatch::Task(patch))
            .await?
            .and_then(Child::into_task)
            .ok_or_else(|| ChildKind::Task.not_found())
    }

    /// Join the event if absent, leave if present
    pub async fn toggle_attendance(&self, event: &Id, user: &Id) -> Result<EventDoc> {
        self.store
            .toggle_attendee(event, user)
            .await?
            .ok_or_else(|| ChildKind::Event.not_found())
    }

    // ------------------------------------------------------------------
    // Integrity
    // ------------------------------------------------------------------

    pub async fn verify_integrity(&self, id: &Id) -> Result<IntegrityReport> {
        let garden = self.load(id).await?;
        let mut lists = Vec::with_capacity(ChildKind::ALL.len());
        for kind in ChildKind::ALL {
            let live: Vec<Id> = self
                .store
                .children_of(id, kind)
                .await?
                .iter()
                .map(|c| c.id().clone())
                .collect();
            lists.push(ListReport::compare(kind, garden.list(kind.list()), &live));
        }
        Ok(IntegrityReport {
            garden: id.clone(),
            consistent: lists.iter().all(ListReport::is_consistent),
            lists,
        })
    }

    /// Rebuild the garden's child lists from a live scan. Owner only.
    ///
    /// Uses the same atomic list operations as normal traffic, so it is safe
    /// to run while the garden is in use.
    pub async fn repair(&self, id: &Id, requester: &Id) -> Result<IntegrityReport> {
        let garden = self.load(id).await?;
        if &garden.owner != requester {
            return Err(not_authorized());
        }

        let report = self.verify_integrity(id).await?;
        if report.consistent {
            return Ok(report);
        }

        for list in &report.lists {
            let field = list.kind.list();
            for stale in &list.dangling {
                self.store.remove_from_list(id, field, stale).await?;
            }
            for dup in &list.duplicated {
                self.store.remove_from_list(id, field, dup).await?;
                if self.owns_child(id, list.kind, dup).await? {
                    self.store.add_to_list(id, field, dup).await?;
                }
            }
            for missing in &list.missing {
                self.store.add_to_list(id, field, missing).await?;
            }
        }

        let after = self.verify_integrity(id).await?;
        info!(garden = %id, consistent = after.consistent, "Garden lists repaired");
        Ok(after)
    }

    async fn owns_child(&self, garden: &Id, kind: ChildKind, id: &Id) -> Result<bool> {
        Ok(self
            .store
            .find_child(kind, id)
            .await?
            .is_some_and(|c| c.garden() == garden))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Id> {
        (0..n).map(|_| Id::new()).collect()
    }

    #[test]
    fn test_compare_consistent() {
        let live = ids(3);
        let report = ListReport::compare(ChildKind::Plant, &live, &live);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_compare_finds_each_kind_of_drift() {
        let live = ids(3);
        let ghost = Id::new();
        let listed = vec![live[0].clone(), live[1].clone(), live[1].clone(), ghost.clone(), ghost.clone()];

        let report = ListReport::compare(ChildKind::Task, &listed, &live);
        assert_eq!(report.missing, vec![live[2].clone()]);
        assert_eq!(report.dangling, vec![ghost]);
        assert_eq!(report.duplicated, vec![live[1].clone()]);
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_list_order_does_not_matter() {
        let live = ids(3);
        let mut listed = live.clone();
        listed.reverse();
        assert!(ListReport::compare(ChildKind::Event, &listed, &live).is_consistent());
    }
}
