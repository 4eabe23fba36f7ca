//! HTTP server implementation
//!
//! hyper http1 over TokioIo, one task per connection. Each request gets a
//! uuid request id, a body size limit and a deadline before it reaches the
//! route table.

use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::routes::{self, message_response, ApiRequest, BoxBody};
use crate::services::{ActivityService, ChatService, GardenService};
use crate::store::GardenStore;
use crate::types::GardenError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn GardenStore>,
    pub jwt: JwtValidator,
    pub gardens: GardenService,
    pub chat: ChatService,
    pub activity: ActivityService,
    /// Backing store name reported by /health
    pub storage: &'static str,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        args: Args,
        store: Arc<dyn GardenStore>,
        jwt: JwtValidator,
        storage: &'static str,
    ) -> Self {
        Self {
            gardens: GardenService::new(Arc::clone(&store)),
            chat: ChatService::new(Arc::clone(&store)),
            activity: ActivityService::new(Arc::clone(&store)),
            args,
            store,
            jwt,
            storage,
            started_at: Instant::now(),
        }
    }
}

/// Run the HTTP server until the process exits
pub async fn run(state: Arc<AppState>) -> Result<(), GardenError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("gardenhub listening on {}", state.args.listen);
    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, state.args.max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(request_id = %request_id, "[{}] Rejected body: {}", addr, e);
            return Ok(message_response(
                StatusCode::BAD_REQUEST,
                "Request body too large",
            ));
        }
    };

    let api_req = ApiRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        auth_header: parts
            .headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        body,
        request_id,
    };

    let response = handle(&state, &api_req).await;

    info!(
        request_id = %api_req.request_id,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "[{}] {} {}",
        addr,
        api_req.method,
        api_req.path
    );
    Ok(response)
}

/// Dispatch a collected request under the configured deadline
pub async fn handle(state: &AppState, req: &ApiRequest) -> Response<BoxBody> {
    match tokio::time::timeout(state.args.request_timeout(), routes::dispatch(state, req)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(request_id = %req.request_id, "{} {} timed out", req.method, req.path);
            message_response(StatusCode::SERVICE_UNAVAILABLE, "Request timed out")
        }
    }
}
