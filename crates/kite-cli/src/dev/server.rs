//! Development HTTP server and HMR WebSocket endpoint.
//!
//! Modules are transformed on request; update messages are pushed to pages
//! over a WebSocket that must offer the `kite-hmr` sub-protocol.

use crate::dev::transform::{self, Served, CLIENT_ROUTE};
use crate::dev::{DevConfig, SharedState};
use crate::error::{CliError, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use kite_hmr::{HmrError, HmrPayload, ModuleRequest, HMR_PROTOCOL};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

const CLIENT_SCRIPT: &str = include_str!("../../assets/client.js");

/// Placeholder in the client script replaced by the HMR route.
const HMR_PATH_PLACEHOLDER: &str = "__KITE_HMR_PATH__";

pub struct DevServer {
    config: DevConfig,
    state: SharedState,
}

impl DevServer {
    pub fn new(config: DevConfig, state: SharedState) -> Self {
        Self { config, state }
    }

    /// Bind the configured address and serve until the task is dropped.
    pub async fn start(self) -> Result<()> {
        let addr = self.config.addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        crate::ui::success(&format!(
            "Development server running at {}",
            self.config.server_url()
        ));

        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let app = self.build_router();
        axum::serve(listener, app)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }

    pub fn build_router(&self) -> Router {
        Router::new()
            .route(&self.config.hmr_path, get(handle_hmr_socket))
            .route(CLIENT_ROUTE, get(handle_client_script))
            .route("/favicon.ico", get(handle_favicon))
            .fallback(handle_module)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state.clone())
    }
}

/// Whether the `Sec-WebSocket-Protocol` header offers the HMR protocol.
fn offers_hmr_protocol(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|protocol| protocol.trim() == HMR_PROTOCOL)
}

async fn handle_hmr_socket(
    State(state): State<SharedState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if !offers_hmr_protocol(&headers) {
        return (
            StatusCode::BAD_REQUEST,
            format!("Expected the '{}' WebSocket sub-protocol", HMR_PROTOCOL),
        )
            .into_response();
    }

    ws.protocols([HMR_PROTOCOL])
        .on_upgrade(move |socket| client_session(socket, state))
}

/// Forward broadcasts to one client until either side goes away.
async fn client_session(socket: WebSocket, state: SharedState) {
    let (id, mut outgoing) = state.connections.register();
    debug!(client = id, clients = state.connections.len(), "hmr client connected");

    let (mut sender, mut receiver) = socket.split();

    match HmrPayload::Connected.to_json() {
        Ok(connected) => {
            if sender.send(Message::Text(connected.into())).await.is_err() {
                state.connections.unregister(id);
                return;
            }
        }
        Err(err) => warn!(error = %err, "failed to encode connected message"),
    }

    loop {
        tokio::select! {
            message = outgoing.recv() => match message {
                Some(text) => {
                    if sender.send(Message::Text(text.to_string().into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Clients only listen.
                Some(Ok(_)) => {}
            },
        }
    }

    state.connections.unregister(id);
    debug!(client = id, "hmr client disconnected");
}

async fn handle_client_script(State(state): State<SharedState>) -> Response {
    let hmr_path = serde_json::Value::from(state.config.hmr_path.as_str()).to_string();
    let script = CLIENT_SCRIPT.replace(HMR_PATH_PLACEHOLDER, &hmr_path);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        script,
    )
        .into_response()
}

async fn handle_favicon() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

async fn handle_module(State(state): State<SharedState>, uri: Uri) -> Response {
    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    let request = match ModuleRequest::parse(url) {
        Ok(request) => request,
        Err(err) => return error_response(&err),
    };

    match transform::serve(&state, &request).await {
        Ok(Served::Redirect(location)) => Redirect::temporary(&location).into_response(),
        Ok(Served::Module(served)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, served.content_type),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            served.body,
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

/// Map a core error to a plain-text response.
///
/// Missing files are 404s; anything else (parse failures included) is a 500
/// carrying the message. There is no fallback to an earlier good parse.
fn error_response(err: &HmrError) -> Response {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        warn!(error = %err, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        err.to_string(),
    )
        .into_response()
}
