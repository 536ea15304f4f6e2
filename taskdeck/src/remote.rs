//! HTTP and WebSocket transport against a `TaskDeck` server.
//!
//! [`RemoteTaskService`] speaks the server's JSON API: it logs in once,
//! remembers the session token, and attaches it as a cookie to every later
//! request, including the WebSocket upgrade for snapshot subscriptions.

use futures_util::StreamExt;
use parking_lot::RwLock;
use reqwest::redirect::Policy;
use reqwest::{RequestBuilder, StatusCode, header};
use taskdeck_core::protocol::{ProtocolError, SESSION_COOKIE, ServerEvent, decode_event};
use taskdeck_core::task::{Task, TaskDraft, TaskError, TaskId};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};
use url::Url;

/// Errors surfaced by the client transport.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configured server URL could not be parsed or joined.
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),

    /// The server URL uses a scheme the transport cannot speak.
    #[error("unsupported server url scheme")]
    Scheme,

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket handshake or stream failure.
    #[error("websocket error: {0}")]
    Ws(#[from] Box<tungstenite::Error>),

    /// A snapshot frame could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A task failed local validation before it was sent.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// The server rejected the credentials or the session expired.
    #[error("invalid credentials")]
    Unauthorized,

    /// The requested task does not exist on the server.
    #[error("task not found")]
    NotFound,

    /// The server rejected the request for another reason.
    #[error("server rejected request ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message body from the server, if any.
        message: String,
    },
}

impl From<tungstenite::Error> for ClientError {
    fn from(e: tungstenite::Error) -> Self {
        Self::Ws(Box::new(e))
    }
}

#[derive(serde::Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(serde::Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(serde::Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

/// Client handle for one `TaskDeck` server.
#[derive(Debug)]
pub struct RemoteTaskService {
    http: reqwest::Client,
    base: Url,
    token: RwLock<Option<String>>,
}

impl RemoteTaskService {
    /// Create a service for the given base URL (e.g. `http://127.0.0.1:8700`).
    ///
    /// Redirects are not followed: the server answers auth failures with a
    /// redirect to `/login`, which the client maps to [`ClientError::Unauthorized`].
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be built.
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(server_url)?;
        let http = reqwest::Client::builder().redirect(Policy::none()).build()?;
        Ok(Self {
            http,
            base,
            token: RwLock::new(None),
        })
    }

    /// The session token from the last successful login, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    fn cookie_value(&self) -> Option<String> {
        self.token
            .read()
            .as_deref()
            .map(|token| format!("{SESSION_COOKIE}={token}"))
    }

    /// Attach the session cookie, send, and map error statuses.
    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let request = match self.cookie_value() {
            Some(cookie) => request.header(header::COOKIE, cookie),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        // Auth middleware answers expired sessions with a redirect to /login.
        if status.is_redirection() {
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let message = response
                .json::<ApiMessage>()
                .await
                .map(|m| m.message)
                .unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// Log in and remember the session token for later requests.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] for rejected credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let request = self
            .http
            .post(self.endpoint("/api/auth/login")?)
            .json(&LoginRequest { username, password });
        let response = self.send(request).await?;
        let body: LoginResponse = response.json().await?;
        *self.token.write() = Some(body.token.clone());
        Ok(body.token)
    }

    /// End the session on the server and forget the local token.
    ///
    /// # Errors
    ///
    /// Returns an error only on transport failure; the server always accepts
    /// a logout.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let request = self.http.get(self.endpoint("/api/auth/logout")?);
        self.send(request).await?;
        *self.token.write() = None;
        Ok(())
    }

    /// Fetch the full task collection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] without a valid session.
    pub async fn fetch_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let request = self.http.get(self.endpoint("/api/tasks")?);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Fetch a single task by id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn fetch_task(&self, id: &TaskId) -> Result<Task, ClientError> {
        let request = self.http.get(self.endpoint(&format!("/api/tasks/{id}"))?);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Create a task from a draft; the server assigns the id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with status 400 for an invalid draft.
    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, ClientError> {
        let request = self.http.post(self.endpoint("/api/tasks")?).json(draft);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Replace the task with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn update_task(&self, id: &TaskId, draft: &TaskDraft) -> Result<Task, ClientError> {
        let request = self
            .http
            .put(self.endpoint(&format!("/api/tasks/{id}"))?)
            .json(draft);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Delete the task with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), ClientError> {
        let request = self
            .http
            .delete(self.endpoint(&format!("/api/tasks/{id}"))?);
        self.send(request).await?;
        Ok(())
    }

    /// Open a snapshot subscription over WebSocket.
    ///
    /// The server sends the current collection immediately and a fresh
    /// snapshot after every committed mutation.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Ws`] if the handshake fails, which includes
    /// being redirected away for a missing or invalid session.
    pub async fn subscribe(&self) -> Result<SnapshotStream, ClientError> {
        let mut url = self.endpoint("/api/tasks/subscribe")?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        if url.set_scheme(scheme).is_err() {
            return Err(ClientError::Scheme);
        }

        let mut request = url.as_str().into_client_request()?;
        if let Some(cookie) = self.cookie_value() {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                request.headers_mut().insert(header::COOKIE, value);
            } else {
                tracing::warn!("session token is not header-safe; connecting without it");
            }
        }

        let (ws, _response) = connect_async(request).await?;
        Ok(SnapshotStream { ws })
    }
}

/// Stream of [`ServerEvent`]s from an open subscription.
#[derive(Debug)]
pub struct SnapshotStream {
    ws: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl SnapshotStream {
    /// Next event from the server; `None` once the stream has closed.
    ///
    /// Non-text frames (ping, pong) are skipped.
    pub async fn next_event(&mut self) -> Option<Result<ServerEvent, ClientError>> {
        while let Some(message) = self.ws.next().await {
            match message {
                Ok(tungstenite::Message::Text(text)) => {
                    return Some(decode_event(text.as_str()).map_err(ClientError::from));
                }
                Ok(tungstenite::Message::Close(_)) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }
}
