//! DrawSync Core Library
//!
//! Platform-agnostic building blocks for the DrawSync shared canvas: the
//! wire protocol, client-side presence and chat state, the drawing tools
//! that turn pointer input into draw operations, snapshot storage and the
//! native WebSocket transport.

pub mod chat;
pub mod presence;
pub mod protocol;
pub mod storage;
pub mod sync;
pub mod tools;

pub use chat::ChatLog;
pub use presence::PresenceTracker;
pub use protocol::{
    ChatMessage, ClientMessage, ConnectionId, DrawKind, DrawOp, EllipseOp, HexColor, LineOp,
    ProtocolError, RectangleOp, RoomCode, ServerMessage, StrokeMode, StrokeSegment,
};
pub use storage::{
    CANVAS_KEY, FileStorage, MemoryStorage, SnapshotStore, StorageError, StorageResult,
};
pub use sync::{ConnectionState, NativeWebSocket, SyncError, SyncEvent};
pub use tools::{DEFAULT_BACKGROUND, StrokeStyle, ToolKind, ToolManager, ToolOutcome};
