//! One participant's view of a shared canvas.
//!
//! The session is the single owner of the surface. Pointer input, relayed
//! messages, undo/redo and chat all go through it, so local and remote
//! changes are applied strictly one after another. Messages for the relay
//! are queued and drained by the caller with [`Session::take_outgoing`].

use drawsync_core::chat::ChatLog;
use drawsync_core::presence::PresenceTracker;
use drawsync_core::protocol::{ChatMessage, ClientMessage, ConnectionId, DrawOp, RoomCode, ServerMessage};
use drawsync_core::storage::SnapshotStore;
use drawsync_core::sync::{ConnectionState, SyncEvent};
use drawsync_core::tools::{ToolKind, ToolManager};
use drawsync_render::{HistoryError, HistoryManager, RenderError, ReplicationEngine, Snapshot, Surface};
use kurbo::Point;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Chat message is empty")]
    EmptyMessage,
    #[error("Room code is empty")]
    EmptyRoom,
}

pub type SessionResult<T> = Result<T, SessionError>;

pub struct Session<S: SnapshotStore> {
    user: String,
    state: ConnectionState,
    local_id: Option<ConnectionId>,
    engine: ReplicationEngine,
    history: HistoryManager<S>,
    tools: ToolManager,
    presence: PresenceTracker,
    chat: ChatLog,
    /// Pending messages for the relay.
    outgoing: Vec<ClientMessage>,
}

impl<S: SnapshotStore> Session<S> {
    /// Create a session over `surface`, restoring the persisted canvas from
    /// `store` before any input is accepted.
    pub fn open(user: impl Into<String>, mut surface: Surface, store: Arc<S>) -> SessionResult<Self> {
        let history = HistoryManager::open(store, &mut surface)?;
        Ok(Self {
            user: user.into(),
            state: ConnectionState::Disconnected,
            local_id: None,
            engine: ReplicationEngine::new(surface),
            history,
            tools: ToolManager::new(),
            presence: PresenceTracker::new(),
            chat: ChatLog::new(),
            outgoing: Vec::new(),
        })
    }

    /// Ask to join `room`. The session is `Connecting` until the relay
    /// acknowledges.
    pub fn join(&mut self, room: RoomCode) -> SessionResult<()> {
        if room.is_empty() {
            return Err(SessionError::EmptyRoom);
        }
        log::info!("Joining room {} as {}", room, self.user);
        self.outgoing.push(ClientMessage::Join {
            room_code: room,
            user: self.user.clone(),
        });
        if !self.state.is_joined() {
            self.state = ConnectionState::Connecting;
        }
        Ok(())
    }

    /// React to a transport event.
    pub fn handle_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Connected => log::info!("WebSocket connected"),
            SyncEvent::Disconnected => {
                log::info!("WebSocket disconnected");
                self.disconnected();
            }
            SyncEvent::Error { message } => {
                log::error!("Sync error: {}", message);
                self.disconnected();
            }
            SyncEvent::Message(msg) => self.handle_message(msg),
        }
    }

    /// Apply one relayed message.
    pub fn handle_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Joined { room_code, id, members } => {
                log::info!("Joined room {} ({} members)", room_code, members.len());
                if self.state.room() != Some(&room_code) {
                    self.presence.clear();
                }
                self.local_id = Some(id);
                self.engine.set_room(Some(room_code.clone()));
                self.state = ConnectionState::Joined(room_code);
            }
            ServerMessage::UserJoined { user, id } => {
                log::info!("{} joined", user);
                self.presence.set_name(id, user);
            }
            ServerMessage::Draw { ref op, .. } => {
                log::trace!("Remote {} operation", op.tool_name());
                self.engine.apply(&msg);
            }
            ServerMessage::Cursor { id, x, y } => self.presence.update_cursor(id, x, y),
            ServerMessage::Chat { message } => self.chat.push(message),
            ServerMessage::PresenceLeave { id } => {
                if self.presence.remove(id) {
                    log::debug!("Removed cursor of {}", id);
                }
            }
        }
    }

    pub fn pointer_down(&mut self, point: Point) {
        self.emit_cursor(point);
        self.tools.begin(point);
    }

    /// Every move reports the cursor; freehand tools also draw a segment.
    pub fn pointer_move(&mut self, point: Point) {
        self.emit_cursor(point);
        if let Some(op) = self.tools.update(point) {
            self.apply_local(op);
        }
    }

    /// Finish the gesture. A gesture that drew something is committed to
    /// history.
    pub fn pointer_up(&mut self, point: Point) -> SessionResult<()> {
        let outcome = self.tools.end(point);
        if let Some(op) = outcome.op {
            self.apply_local(op);
        }
        if outcome.completed {
            self.history.commit(self.engine.surface())?;
        }
        Ok(())
    }

    /// Run a whole gesture with `tool`, keeping the selected tool afterwards.
    pub fn gesture(&mut self, tool: ToolKind, points: &[Point]) -> SessionResult<()> {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Ok(());
        };
        let selected = self.tools.current_tool;
        self.tools.set_tool(tool);

        self.pointer_down(*first);
        for point in &points[1..] {
            self.pointer_move(*point);
        }
        let result = self.pointer_up(*last);

        self.tools.set_tool(selected);
        result
    }

    /// Send a chat line. It is added to the local log right away; the relay
    /// never echoes it back.
    pub fn send_chat(&mut self, text: &str) -> SessionResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let message = ChatMessage::now(self.user.clone(), text);
        self.chat.push(message.clone());
        if let Some(room) = self.state.room() {
            self.outgoing.push(ClientMessage::Chat {
                room_code: room.clone(),
                message,
            });
        }
        Ok(())
    }

    /// Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> SessionResult<bool> {
        Ok(self.history.undo(self.engine.surface_mut())?)
    }

    /// Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> SessionResult<bool> {
        Ok(self.history.redo(self.engine.surface_mut())?)
    }

    /// Clear the local canvas. Only this client's canvas changes.
    pub fn clear(&mut self) -> SessionResult<()> {
        self.tools.cancel();
        self.engine.clear();
        self.history.commit(self.engine.surface())?;
        Ok(())
    }

    /// Resize the canvas, keeping content anchored at the top-left.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.engine.surface_mut().resize(width, height);
    }

    /// Write the current canvas to `path` as PNG.
    pub fn export_png(&self, path: &Path) -> SessionResult<()> {
        let snapshot = Snapshot::capture(self.engine.surface())?;
        std::fs::write(path, snapshot.as_bytes())?;
        log::info!("Exported canvas to {}", path.display());
        Ok(())
    }

    /// Drain pending messages for the relay.
    pub fn take_outgoing(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn local_id(&self) -> Option<ConnectionId> {
        self.local_id
    }

    pub fn surface(&self) -> &Surface {
        self.engine.surface()
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolManager {
        &mut self.tools
    }

    pub fn history(&self) -> &HistoryManager<S> {
        &self.history
    }

    fn apply_local(&mut self, op: DrawOp) {
        if let Some(msg) = self.engine.apply_local(op) {
            self.outgoing.push(msg);
        }
    }

    fn emit_cursor(&mut self, point: Point) {
        if let Some(room) = self.state.room() {
            self.outgoing.push(ClientMessage::Cursor {
                room_code: room.clone(),
                x: point.x,
                y: point.y,
            });
        }
    }

    /// Channel gone: forget every remote participant. Nothing is replayed
    /// on a later join.
    fn disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.local_id = None;
        self.engine.set_room(None);
        self.presence.clear();
        self.outgoing.clear();
    }
}
