//! Recent activity feed

use hyper::{Response, StatusCode};

use super::{json_response, ApiRequest, BoxBody};
use crate::server::AppState;
use crate::types::Result;

/// GET /api/activity
pub async fn recent(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    req.caller(state)?;
    let entries = state.activity.recent().await?;
    Ok(json_response(StatusCode::OK, &entries))
}
