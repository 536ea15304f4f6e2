//! `TaskDeck` API server library.
//!
//! Exposes the document store and HTTP server for use in tests and
//! embedding. The server owns the authoritative task collection, assigns
//! document identifiers, guards every protected route behind a signed
//! session cookie, and pushes full-collection snapshots to WebSocket
//! subscribers after each committed mutation.

pub mod config;
pub mod server;
pub mod session;
pub mod store;
