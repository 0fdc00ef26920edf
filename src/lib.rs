//! # Chatcast
//!
//! `chatcast` is the real-time fanout backbone of a multi-tenant chat
//! service: every message written to a chat is pushed to all clients
//! currently connected to that chat, with per-chat broadcasters created on
//! the first subscriber and torn down when the last one leaves.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `broker`: the fanout core, the per-chat broadcaster and the registry that owns it.
//! - `bridge`: the publish/subscribe bus the broadcasters listen on.
//! - `client`: the delivery endpoint of a single live connection.
//! - `persistence`: durable storage of chats and messages, and the authority on which chats exist.
//! - `transport`: the WebSocket server and the client-facing protocol.
//! - `config`: handles loading and managing server configuration.
//! - `utils`: shared error and logging plumbing.

pub mod bridge;
pub mod broker;
pub mod client;
pub mod config;
pub mod persistence;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;
