//! Garden chat routes

use hyper::{Response, StatusCode};
use serde::Deserialize;

use super::{json_response, ApiRequest, BoxBody};
use crate::db::schemas::{MessageCursor, NewMessage};
use crate::server::AppState;
use crate::types::{GardenError, Id, Result, Timestamp};

/// `since` is the last seen message's `createdAt`, `after` its `_id`
#[derive(Deserialize, Default)]
struct ChatQuery {
    since: Option<String>,
    after: Option<String>,
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ChatQuery {
    fn cursor(&self) -> Result<Option<MessageCursor>> {
        let since = match present(&self.since) {
            None if present(&self.after).is_some() => {
                return Err(GardenError::BadRequest("after requires since".into()))
            }
            None => return Ok(None),
            Some(raw) => Timestamp::parse(raw)
                .ok_or_else(|| GardenError::BadRequest(format!("Invalid since: {}", raw)))?,
        };
        let after = present(&self.after)
            .map(|raw| {
                Id::parse(raw, "Message")
                    .map_err(|_| GardenError::BadRequest(format!("Invalid after: {}", raw)))
            })
            .transpose()?;
        Ok(Some(MessageCursor {
            created_at: since,
            after,
        }))
    }
}

/// GET /api/chat/garden/:gardenId[?since=&after=]
pub async fn list(state: &AppState, req: &ApiRequest, garden: &str) -> Result<Response<BoxBody>> {
    req.caller(state)?;
    let garden = Id::parse(garden, "Garden")?;
    let query: ChatQuery = req.query()?;
    let messages = state.chat.list_messages(&garden, query.cursor()?).await?;
    Ok(json_response(StatusCode::OK, &messages))
}

/// POST /api/chat/garden/:gardenId
pub async fn post(state: &AppState, req: &ApiRequest, garden: &str) -> Result<Response<BoxBody>> {
    let user = req.caller(state)?;
    let garden = Id::parse(garden, "Garden")?;
    let input: NewMessage = req.json()?;
    let message = state.chat.post_message(&garden, &user.id, input).await?;
    Ok(json_response(StatusCode::CREATED, &message))
}
