//! Plant, task and event routes
//!
//! The three kinds share one set of handlers; the path segment picks the
//! body type.

use hyper::{Method, Response, StatusCode};

use super::{json_response, message_response, not_found_response, ApiRequest, BoxBody};
use crate::db::schemas::{ChildKind, ChildPatch, NewChild};
use crate::server::AppState;
use crate::services::StatusChange;
use crate::types::{Id, Result};

/// Route `/api/{plants,tasks,events}/...`; `rest` is the path after the kind
pub async fn route(
    state: &AppState,
    req: &ApiRequest,
    kind: ChildKind,
    rest: &[&str],
) -> Result<Response<BoxBody>> {
    match (&req.method, kind, rest) {
        (&Method::GET, _, ["garden", garden]) => list(state, req, kind, garden).await,
        (&Method::POST, _, ["garden", garden]) => create(state, req, kind, garden).await,
        (&Method::PATCH, ChildKind::Task, [id, "status"]) => set_status(state, req, id).await,
        (&Method::PATCH, ChildKind::Event, [id, "attend"]) => attend(state, req, id).await,
        (&Method::PATCH, _, [id]) => update(state, req, kind, id).await,
        (&Method::DELETE, _, [id]) => delete(state, req, kind, id).await,
        _ => Ok(not_found_response(&req.path)),
    }
}

fn new_child(kind: ChildKind, req: &ApiRequest) -> Result<NewChild> {
    Ok(match kind {
        ChildKind::Plant => NewChild::Plant(req.json()?),
        ChildKind::Task => NewChild::Task(req.json()?),
        ChildKind::Event => NewChild::Event(req.json()?),
    })
}

fn child_patch(kind: ChildKind, req: &ApiRequest) -> Result<ChildPatch> {
    Ok(match kind {
        ChildKind::Plant => ChildPatch::Plant(req.json()?),
        ChildKind::Task => ChildPatch::Task(req.json()?),
        ChildKind::Event => ChildPatch::Event(req.json()?),
    })
}

/// GET /api/{kind}/garden/:gardenId
async fn list(
    state: &AppState,
    req: &ApiRequest,
    kind: ChildKind,
    garden: &str,
) -> Result<Response<BoxBody>> {
    req.caller(state)?;
    let garden = Id::parse(garden, "Garden")?;
    let children = state.gardens.list_children(&garden, kind).await?;
    Ok(json_response(StatusCode::OK, &children))
}

/// POST /api/{kind}/garden/:gardenId
async fn create(
    state: &AppState,
    req: &ApiRequest,
    kind: ChildKind,
    garden: &str,
) -> Result<Response<BoxBody>> {
    let user = req.caller(state)?;
    let garden = Id::parse(garden, "Garden")?;
    let input = new_child(kind, req)?;
    let child = state.gardens.add_child(&garden, input, &user.id).await?;
    Ok(json_response(StatusCode::CREATED, &child))
}

/// PATCH /api/{kind}/:id
async fn update(
    state: &AppState,
    req: &ApiRequest,
    kind: ChildKind,
    id: &str,
) -> Result<Response<BoxBody>> {
    req.caller(state)?;
    let id = Id::parse(id, kind.label())?;
    let patch = child_patch(kind, req)?;
    let child = state.gardens.update_child(&id, patch).await?;
    Ok(json_response(StatusCode::OK, &child))
}

/// DELETE /api/{kind}/:id
async fn delete(
    state: &AppState,
    req: &ApiRequest,
    kind: ChildKind,
    id: &str,
) -> Result<Response<BoxBody>> {
    req.caller(state)?;
    let id = Id::parse(id, kind.label())?;
    state.gardens.remove_child(kind, &id).await?;
    Ok(message_response(
        StatusCode::OK,
        &format!("{} deleted", kind.label()),
    ))
}

/// PATCH /api/tasks/:id/status
async fn set_status(state: &AppState, req: &ApiRequest, id: &str) -> Result<Response<BoxBody>> {
    req.caller(state)?;
    let id = Id::parse(id, ChildKind::Task.label())?;
    let change: StatusChange = req.json()?;
    let task = state.gardens.set_task_status(&id, change).await?;
    Ok(json_response(StatusCode::OK, &task))
}

/// PATCH /api/events/:id/attend
async fn attend(state: &AppState, req: &ApiRequest, id: &str) -> Result<Response<BoxBody>> {
    let user = req.caller(state)?;
    let id = Id::parse(id, ChildKind::Event.label())?;
    let event = state.gardens.toggle_attendance(&id, &user.id).await?;
    Ok(json_response(StatusCode::OK, &event))
}
