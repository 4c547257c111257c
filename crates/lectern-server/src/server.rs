//! Development server implementation.

use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::livereload::{
    client_script, inject_script, ReloadHub, ReloadMessage, SCRIPT_PATH, SOCKET_PATH,
};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Host to bind to
    pub host: String,

    /// First port to try
    pub port: u16,

    /// How many consecutive ports to try before giving up
    pub port_attempts: u16,

    /// Directories served, first match wins
    pub roots: Vec<PathBuf>,

    /// Inject the reload client and accept reload connections
    pub livereload: bool,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            port_attempts: 20,
            roots: vec![PathBuf::from(".")],
            livereload: true,
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("No free port on {host} between {first} and {last}")]
    PortsExhausted { host: String, first: u16, last: u16 },

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Invalid watch pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Server error: {0}")]
    Serve(String),
}

/// Bind `host:port`, moving on to the next port while the address is taken.
pub async fn bind_available(
    host: &str,
    port: u16,
    attempts: u16,
) -> Result<TcpListener, ServerError> {
    let mut last = port;

    for offset in 0..attempts.max(1) {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        last = candidate;

        let addr = if host.contains(':') {
            format!("[{}]:{}", host, candidate)
        } else {
            format!("{}:{}", host, candidate)
        };

        match TcpListener::bind(&addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                tracing::warn!("Port {} is already in use, trying the next one", candidate);
            }
            Err(e) => {
                return Err(ServerError::Bind {
                    addr,
                    message: e.to_string(),
                })
            }
        }
    }

    Err(ServerError::PortsExhausted {
        host: host.to_string(),
        first: port,
        last,
    })
}

/// Shared server state.
struct ServerState {
    roots: Vec<PathBuf>,
    livereload: bool,
    hub: ReloadHub,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
    hub: ReloadHub,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self::with_hub(config, ReloadHub::new())
    }

    /// Create a server whose reload hub is shared with a watcher.
    pub fn with_hub(config: DevServerConfig, hub: ReloadHub) -> Self {
        Self { config, hub }
    }

    pub fn config(&self) -> &DevServerConfig {
        &self.config
    }

    pub fn hub(&self) -> &ReloadHub {
        &self.hub
    }

    /// Build the router: static roots plus the live reload endpoints.
    pub fn router(&self) -> Router {
        let state = Arc::new(ServerState {
            roots: self.config.roots.clone(),
            livereload: self.config.livereload,
            hub: self.hub.clone(),
        });

        let mut router = Router::new();
        if self.config.livereload {
            router = router
                .route(SOCKET_PATH, get(ws_handler))
                .route(SCRIPT_PATH, get(script_handler));
        }

        router.fallback(static_handler).with_state(state)
    }

    /// Bind the configured address, falling back to later ports.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        bind_available(&self.config.host, self.config.port, self.config.port_attempts).await
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Serve(e.to_string()))?;
        let url = format!("http://{}", addr);

        let roots: Vec<String> = self
            .config
            .roots
            .iter()
            .map(|r| r.display().to_string())
            .collect();
        tracing::info!("Serving {} at {}", roots.join(", "), url);

        if self.config.open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Could not open browser: {}", e);
            }
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))
    }
}

/// Serve a file from the first root that has it.
async fn static_handler(State(state): State<Arc<ServerState>>, req: Request) -> Response {
    let (parts, _) = req.into_parts();

    for root in &state.roots {
        let mut attempt = Request::new(Body::empty());
        *attempt.method_mut() = parts.method.clone();
        *attempt.uri_mut() = parts.uri.clone();
        *attempt.headers_mut() = parts.headers.clone();

        let response = match ServeDir::new(root).oneshot(attempt).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        if response.status() == StatusCode::NOT_FOUND {
            continue;
        }

        let response = response.map(Body::new);
        if state.livereload && parts.method == Method::GET {
            return with_reload_script(response).await;
        }
        return response;
    }

    (StatusCode::NOT_FOUND, "Not found").into_response()
}

/// Inject the reload client into a full HTML response.
async fn with_reload_script(response: Response) -> Response {
    let is_html = response.status() == StatusCode::OK
        && response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read page for reload injection: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

/// Forward reload messages to one browser until it disconnects.
async fn handle_ws(mut socket: WebSocket, hub: ReloadHub) {
    let mut rx = hub.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    loop {
        match rx.recv().await {
            Ok(msg) => {
                if send_message(&mut socket, &msg).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

async fn script_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], client_script())
}
