//! HTTP server core: shared state, session guard, auth and task routes, and
//! the WebSocket snapshot subscription.
//!
//! Every route outside the public allow-list requires a valid session
//! cookie; failures redirect to the login entry point rather than returning
//! an error body. Task mutations are committed to the [`DocumentStore`]
//! first; the store broadcasts a full-collection snapshot that this module
//! forwards to every subscribed WebSocket in commit order.

use std::sync::Arc;

use axum::Json;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use taskdeck_core::dashboard::DashboardStats;
use taskdeck_core::protocol::{ServerEvent, encode_event};
use taskdeck_core::task::{Task, TaskDraft, TaskId};

use crate::config::ServerConfig;
use crate::session::{SessionKeys, expired_cookie, is_public_path, session_cookie, token_from_cookie_header};
use crate::store::DocumentStore;

/// Fixed demo credentials accepted by the login endpoint.
const DEMO_USERNAME: &str = "admin";
const DEMO_PASSWORD: &str = "1234";

/// Shared server state holding the document store and session keys.
pub struct AppState {
    /// Authoritative task collection.
    pub store: DocumentStore,
    keys: SessionKeys,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates state with an empty store and the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&ServerConfig::default())
    }

    /// Creates state from a resolved [`ServerConfig`].
    #[must_use]
    pub fn with_config(config: &ServerConfig) -> Self {
        Self {
            store: DocumentStore::with_snapshot_buffer(config.snapshot_buffer),
            keys: SessionKeys::new(&config.jwt_secret),
        }
    }

    /// True when the session keys are derived from the fallback secret.
    #[must_use]
    pub const fn uses_default_secret(&self) -> bool {
        self.keys.is_default_secret()
    }
}

/// Builds the full application router over the given state.
fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/", get(list_tasks))
        .route("/settings", get(settings_page))
        .route("/dashboard", get(dashboard_page))
        .route("/task/{id}", get(get_task))
        .route("/login", get(login_page))
        .route("/api/auth/login", axum::routing::post(login))
        .route("/api/auth/logout", get(logout))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/subscribe", get(subscribe))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(replace_task).delete(delete_task),
        )
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            require_session,
        ))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Session guard
// ---------------------------------------------------------------------------

/// Middleware guarding every non-public route.
///
/// A missing, malformed, or expired token uniformly produces a redirect to
/// `/login`; no distinction is surfaced to the caller.
async fn require_session(
    State(state): State<Arc<AppState>>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let path = req.uri().path();
    if is_public_path(path) {
        return next.run(req).await;
    }

    let token = req
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(token_from_cookie_header);

    match token {
        Some(token) if state.keys.verify(token).is_ok() => next.run(req).await,
        _ => {
            tracing::debug!(path = %path, "unauthenticated request, redirecting to login");
            Redirect::temporary("/login").into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Auth routes
// ---------------------------------------------------------------------------

/// Login request body.
#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// `POST /api/auth/login` — fixed demo credential check.
async fn login(State(state): State<Arc<AppState>>, Json(req): Json<LoginRequest>) -> Response {
    if req.username == DEMO_USERNAME && req.password == DEMO_PASSWORD {
        match state.keys.issue(&req.username) {
            Ok(token) => {
                tracing::info!(username = %req.username, "login succeeded");
                (
                    StatusCode::OK,
                    [(header::SET_COOKIE, session_cookie(&token))],
                    Json(json!({ "token": token, "message": "Login Successfull" })),
                )
                    .into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to sign session token");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    } else {
        tracing::warn!(username = %req.username, "login rejected");
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
            .into_response()
    }
}

/// `GET /api/auth/logout` — clears the session cookie unconditionally.
async fn logout() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, expired_cookie())],
        Json(json!({ "message": "Logged out successfully" })),
    )
}

/// `GET /login` — public entry point (views are rendered elsewhere).
async fn login_page() -> impl IntoResponse {
    Json(json!({ "message": "TaskDeck login" }))
}

/// `GET /settings` — placeholder settings document.
async fn settings_page() -> impl IntoResponse {
    Json(json!({ "message": "Settings" }))
}

// ---------------------------------------------------------------------------
// Task routes
// ---------------------------------------------------------------------------

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Task not found" })),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": message })),
    )
        .into_response()
}

/// `GET /api/tasks` (and `GET /`) — full collection in insertion order.
async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<Task>> {
    Json(state.store.list().await)
}

/// `GET /api/tasks/{id}` (and `GET /task/{id}`) — one task or 404.
async fn get_task(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.store.get(&TaskId::new(id)).await {
        Some(task) => Json(task).into_response(),
        None => not_found(),
    }
}

/// `POST /api/tasks` — validate the draft, assign an id, return 201.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<TaskDraft>,
) -> Response {
    if let Err(e) = draft.validate() {
        return bad_request(&e.to_string());
    }
    let task = state.store.insert(draft).await;
    tracing::info!(id = %task.id, title = %task.title, "task created");
    (StatusCode::CREATED, Json(task)).into_response()
}

/// `PUT /api/tasks/{id}` — full-record replace.
async fn replace_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(draft): Json<TaskDraft>,
) -> Response {
    if let Err(e) = draft.validate() {
        return bad_request(&e.to_string());
    }
    match state.store.replace(&TaskId::new(id), draft).await {
        Ok(task) => {
            tracing::info!(id = %task.id, "task replaced");
            Json(task).into_response()
        }
        Err(_) => not_found(),
    }
}

/// `DELETE /api/tasks/{id}` — remove by id.
async fn delete_task(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let id = TaskId::new(id);
    match state.store.delete(&id).await {
        Ok(()) => {
            tracing::info!(id = %id, "task deleted");
            Json(json!({ "deleted": id })).into_response()
        }
        Err(_) => not_found(),
    }
}

/// `GET /dashboard` — aggregate statistics for the current collection.
async fn dashboard_page(State(state): State<Arc<AppState>>) -> Json<DashboardStats> {
    let tasks = state.store.list().await;
    Json(DashboardStats::for_today(&tasks))
}

// ---------------------------------------------------------------------------
// Snapshot subscription
// ---------------------------------------------------------------------------

/// `GET /api/tasks/subscribe` — upgrade to a WebSocket snapshot stream.
async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_subscription(socket, state))
}

/// Streams snapshots to one subscriber until it disconnects.
///
/// The connection lifecycle:
/// 1. Subscribe to the store's broadcast channel.
/// 2. Send the current collection immediately.
/// 3. Forward each broadcast snapshot in commit order.
/// 4. Stop on client close or send failure.
async fn handle_subscription(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.store.subscribe();

    let initial = state.store.list().await;
    if send_snapshot(&mut socket, initial).await.is_err() {
        tracing::warn!("failed to send initial snapshot");
        return;
    }
    tracing::debug!("snapshot subscriber connected");

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(tasks) => {
                    if send_snapshot(&mut socket, tasks).await.is_err() {
                        tracing::debug!("subscriber send failed, closing");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // The next received snapshot supersedes the skipped ones.
                    tracing::warn!(skipped, "subscriber lagged behind snapshot stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!("snapshot subscriber disconnected");
                    break;
                }
                Some(Ok(_)) => {
                    // Ignore client frames; the stream is one-directional.
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "subscription socket error");
                    break;
                }
            },
        }
    }
}

/// Encodes and sends one snapshot frame.
async fn send_snapshot(socket: &mut WebSocket, tasks: Vec<Task>) -> Result<(), ()> {
    let text = encode_event(&ServerEvent::Snapshot { tasks }).map_err(|e| {
        tracing::error!(error = %e, "failed to encode snapshot");
    })?;
    socket.send(Message::Text(text.into())).await.map_err(|_| ())
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Starts the server on the given address and returns the bound address and
/// a join handle.
///
/// This is the primary entry point used by both `main.rs` and test code.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(AppState::new())).await
}

/// Starts the server with a pre-configured [`AppState`].
///
/// Use [`AppState::with_config`] to create state from a resolved
/// [`ServerConfig`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}
