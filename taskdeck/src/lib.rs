//! `TaskDeck` client library.
//!
//! Provides the in-memory task collection state ([`store`]), the HTTP/WebSocket
//! transport against a `TaskDeck` server ([`remote`]), the glue that keeps the
//! two consistent ([`sync`]), and layered configuration ([`config`]).

pub mod config;
pub mod remote;
pub mod store;
pub mod sync;
