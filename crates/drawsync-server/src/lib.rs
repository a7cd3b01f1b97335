//! DrawSync WebSocket Relay Server
//!
//! Fans drawing, cursor and chat operations out to the other members of the
//! sender's room. The server keeps no document: it only knows which
//! connection is in which room.
//!
//! ## Protocol
//!
//! Messages are JSON objects tagged by `type`:
//! ```json
//! { "type": "join", "roomCode": "ABC123", "user": "alice" }
//! { "type": "draw", "roomCode": "ABC123", "tool": "line", "startX": 10, "startY": 10, "endX": 50, "endY": 50, "color": "#ff0000", "lineWidth": 2 }
//! { "type": "cursor", "roomCode": "ABC123", "x": 100, "y": 200 }
//! { "type": "chat", "roomCode": "ABC123", "message": { "user": "alice", "text": "hi", "timestamp": "14:02" } }
//! ```
//! A closed channel is announced to its room as `presence_leave`.

pub mod config;
pub mod registry;
pub mod relay;
pub mod server;

pub use config::ServerConfig;
pub use registry::{JoinOutcome, RoomRegistry};
pub use relay::{Frame, Relay, RoutingError};
pub use server::{ServerError, router, run, serve};
