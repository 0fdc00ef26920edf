//! The `transport` module is responsible for handling network communication
//! with clients, primarily via WebSockets.
//!
//! It defines the messaging protocol used between clients and the server,
//! and implements the WebSocket server itself: accepting connections,
//! parsing client frames, registering sessions with the fanout core, and
//! streaming each session's outbox back to the socket.

pub mod message;
pub mod websocket;
