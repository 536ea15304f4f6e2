//! Wire frames for the snapshot subscription.
//!
//! The document store pushes the full current task collection whenever it
//! changes; each frame fully supersedes all prior local state. Frames are
//! JSON text messages on the WebSocket, matching the persisted remote
//! schema's field names.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::Task;

/// Name of the session cookie both sides exchange.
pub const SESSION_COOKIE: &str = "token";

/// Errors that can occur encoding or decoding subscription frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame serialization failed.
    #[error("snapshot encode error: {0}")]
    Encode(#[source] serde_json::Error),
    /// Frame deserialization failed.
    #[error("snapshot decode error: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Events pushed from the document store to a subscribed client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full current collection, in insertion order. Replaces all prior
    /// client state for the collection.
    Snapshot {
        /// Every task currently in the store.
        tasks: Vec<Task>,
    },
}

/// Encodes a [`ServerEvent`] as a JSON string.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_event(event: &ServerEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(ProtocolError::Encode)
}

/// Decodes a [`ServerEvent`] from a JSON string.
///
/// # Errors
///
/// Returns [`ProtocolError::Decode`] if deserialization fails.
pub fn decode_event(text: &str) -> Result<ServerEvent, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}
