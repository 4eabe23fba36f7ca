//! Garden routes: directory, detail, membership, deletion and integrity

use hyper::{Response, StatusCode};

use super::{json_response, message_response, ApiRequest, BoxBody};
use crate::db::schemas::NewGarden;
use crate::server::AppState;
use crate::types::{Id, Result};

/// GET /api/gardens
pub async fn list(state: &AppState) -> Result<Response<BoxBody>> {
    let gardens = state.gardens.list().await?;
    Ok(json_response(StatusCode::OK, &gardens))
}

/// POST /api/gardens
pub async fn create(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let user = req.caller(state)?;
    let input: NewGarden = req.json()?;
    let garden = state.gardens.create(&user.id, input).await?;
    Ok(json_response(StatusCode::CREATED, &garden))
}

/// GET /api/gardens/:id
pub async fn get(state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let id = Id::parse(id, "Garden")?;
    let detail = state.gardens.get_with_stats(&id).await?;
    Ok(json_response(StatusCode::OK, &detail))
}

/// GET /api/gardens/user/my-gardens
pub async fn my_gardens(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let user = req.caller(state)?;
    let gardens = state.gardens.for_user(&user.id).await?;
    Ok(json_response(StatusCode::OK, &gardens))
}

/// GET /api/gardens/user/created
pub async fn created(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let user = req.caller(state)?;
    let gardens = state.gardens.created_by(&user.id).await?;
    Ok(json_response(StatusCode::OK, &gardens))
}

/// POST /api/gardens/:id/members
pub async fn join(state: &AppState, req: &ApiRequest, id: &str) -> Result<Response<BoxBody>> {
    let user = req.caller(state)?;
    let id = Id::parse(id, "Garden")?;
    let garden = state.gardens.join(&id, &user.id).await?;
    Ok(json_response(StatusCode::OK, &garden))
}

/// POST /api/gardens/:id/leave
pub async fn leave(state: &AppState, req: &ApiRequest, id: &str) -> Result<Response<BoxBody>> {
    let user = req.caller(state)?;
    let id = Id::parse(id, "Garden")?;
    state.gardens.leave(&id, &user.id).await?;
    Ok(message_response(StatusCode::OK, "Left the garden successfully"))
}

/// DELETE /api/gardens/:id
pub async fn delete(state: &AppState, req: &ApiRequest, id: &str) -> Result<Response<BoxBody>> {
    let user = req.caller(state)?;
    let id = Id::parse(id, "Garden")?;
    state.gardens.delete_garden(&id, &user.id).await?;
    Ok(message_response(StatusCode::OK, "Garden deleted successfully"))
}

/// GET /api/gardens/:id/integrity
pub async fn integrity(state: &AppState, req: &ApiRequest, id: &str) -> Result<Response<BoxBody>> {
    req.caller(state)?;
    let id = Id::parse(id, "Garden")?;
    let report = state.gardens.verify_integrity(&id).await?;
    Ok(json_response(StatusCode::OK, &report))
}

/// POST /api/gardens/:id/repair
pub async fn repair(state: &AppState, req: &ApiRequest, id: &str) -> Result<Response<BoxBody>> {
    let user = req.caller(state)?;
    let id = Id::parse(id, "Garden")?;
    let report = state.gardens.repair(&id, &user.id).await?;
    Ok(json_response(StatusCode::OK, &report))
}
