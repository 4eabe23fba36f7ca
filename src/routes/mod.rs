//! HTTP routes for gardenhub
//!
//! Handlers take an `ApiRequest` whose body has already been read, so the
//! whole routing table can be driven without a socket.

pub mod activity;
pub mod chat;
pub mod children;
pub mod gardens;
pub mod health;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::error;

use crate::auth::AuthUser;
use crate::db::schemas::ChildKind;
use crate::server::AppState;
use crate::types::{GardenError, Result};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// A request with its body already collected
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub auth_header: Option<String>,
    pub body: Bytes,
    pub request_id: String,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            auth_header: None,
            body: Bytes::new(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.auth_header = Some(format!("Bearer {}", token));
        self
    }

    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = Bytes::from(body.to_string());
        self
    }

    /// Decode the JSON body; an empty body reads as `{}`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_slice(b"{}")?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decode the query string
    pub fn query<T: DeserializeOwned + Default>(&self) -> Result<T> {
        match self.query.as_deref() {
            None | Some("") => Ok(T::default()),
            Some(raw) => serde_urlencoded::from_str(raw)
                .map_err(|e| GardenError::BadRequest(format!("Invalid query: {}", e))),
        }
    }

    pub fn caller(&self, state: &AppState) -> Result<AuthUser> {
        state.jwt.authenticate(self.auth_header.as_deref())
    }
}

/// Route a request to its handler
pub async fn dispatch(state: &AppState, req: &ApiRequest) -> Response<BoxBody> {
    if req.method == Method::OPTIONS {
        return cors_preflight();
    }

    let path = req.path.trim_end_matches('/');
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    let result = match (&req.method, segments.as_slice()) {
        (&Method::GET, ["health"]) => Ok(health::health_check(state)),

        // Gardens
        (&Method::GET, ["api", "gardens"]) => gardens::list(state).await,
        (&Method::POST, ["api", "gardens"]) => gardens::create(state, req).await,
        (&Method::GET, ["api", "gardens", "user", "my-gardens"]) => {
            gardens::my_gardens(state, req).await
        }
        (&Method::GET, ["api", "gardens", "user", "created"]) => gardens::created(state, req).await,
        (&Method::GET, ["api", "gardens", id]) => gardens::get(state, id).await,
        (&Method::DELETE, ["api", "gardens", id]) => gardens::delete(state, req, id).await,
        (&Method::POST, ["api", "gardens", id, "members"]) => gardens::join(state, req, id).await,
        (&Method::POST, ["api", "gardens", id, "leave"]) => gardens::leave(state, req, id).await,
        (&Method::GET, ["api", "gardens", id, "integrity"]) => {
            gardens::integrity(state, req, id).await
        }
        (&Method::POST, ["api", "gardens", id, "repair"]) => gardens::repair(state, req, id).await,

        // Plants, tasks and events
        (_, ["api", segment, rest @ ..]) if child_kind(segment).is_some() => {
            match child_kind(segment) {
                Some(kind) => children::route(state, req, kind, rest).await,
                None => Ok(not_found_response(&req.path)),
            }
        }

        // Chat
        (&Method::GET, ["api", "chat", "garden", garden]) => chat::list(state, req, garden).await,
        (&Method::POST, ["api", "chat", "garden", garden]) => chat::post(state, req, garden).await,

        (&Method::GET, ["api", "activity"]) => activity::recent(state, req).await,

        _ => Ok(not_found_response(&req.path)),
    };

    result.unwrap_or_else(|err| error_response(&err, &req.request_id))
}

/// `plants` / `tasks` / `events` path segment to kind
fn child_kind(segment: &str) -> Option<ChildKind> {
    match segment {
        "plants" => Some(ChildKind::Plant),
        "tasks" => Some(ChildKind::Task),
        "events" => Some(ChildKind::Event),
        _ => None,
    }
}

// =============================================================================
// Response Helpers
// =============================================================================

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    match serde_json::to_vec(body) {
        Ok(json) => with_cors(Response::builder().status(status))
            .header("Content-Type", "application/json")
            .body(full_body(json))
            .unwrap_or_else(|_| fallback_response()),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            fallback_response()
        }
    }
}

/// `{"message": ...}` body
pub fn message_response(status: StatusCode, message: &str) -> Response<BoxBody> {
    json_response(status, &serde_json::json!({ "message": message }))
}

/// Map an error to its HTTP form.
///
/// Validation failures list their fields. Store and internal failures are
/// logged here and reach the caller only as "Server error".
pub fn error_response(err: &GardenError, request_id: &str) -> Response<BoxBody> {
    let status = err.status_code();
    if !err.is_expected() {
        error!(request_id = %request_id, "Request failed: {}", err);
        return message_response(status, "Server error");
    }

    match err {
        GardenError::Validation(fields) => {
            json_response(status, &serde_json::json!({ "errors": fields }))
        }
        GardenError::BadRequest(m)
        | GardenError::Unauthorized(m)
        | GardenError::Forbidden(m)
        | GardenError::NotFound(m) => message_response(status, m),
        other => message_response(status, &other.to_string()),
    }
}

pub fn cors_preflight() -> Response<BoxBody> {
    with_cors(Response::builder().status(StatusCode::NO_CONTENT))
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap_or_else(|_| fallback_response())
}

pub(crate) fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "message": "Not Found", "path": path }),
    )
}

fn with_cors(builder: hyper::http::response::Builder) -> hyper::http::response::Builder {
    builder
        .header("Access-Control-Allow-Origin", "*")
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PATCH, DELETE, OPTIONS",
        )
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
}

fn fallback_response() -> Response<BoxBody> {
    let mut response = Response::new(full_body(r#"{"message":"Server error"}"#));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}
