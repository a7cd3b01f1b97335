//! Replication of draw operations onto the shared surface.
//!
//! Local and relayed operations go through the same render dispatch and
//! land on the same surface in arrival order. There is no reordering and
//! no conflict resolution: two clients that receive overlapping strokes in
//! different orders may end up with a different z-order, and that is
//! accepted.

use crate::renderer::render;
use crate::surface::Surface;
use drawsync_core::protocol::{ClientMessage, DrawOp, RoomCode, ServerMessage};

/// Applies draw operations to one client's surface.
#[derive(Debug, Clone)]
pub struct ReplicationEngine {
    surface: Surface,
    room: Option<RoomCode>,
}

impl ReplicationEngine {
    pub fn new(surface: Surface) -> Self {
        Self { surface, room: None }
    }

    /// Set the room that outgoing operations are tagged with.
    pub fn set_room(&mut self, room: Option<RoomCode>) {
        self.room = room;
    }

    pub fn room(&self) -> Option<&RoomCode> {
        self.room.as_ref()
    }

    /// Render a locally produced operation and build the `draw` message
    /// for the relay. Returns `None` when no room is active; the operation
    /// is still rendered.
    pub fn apply_local(&mut self, op: DrawOp) -> Option<ClientMessage> {
        render(&mut self.surface, &op);
        let room_code = self.room.clone()?;
        Some(ClientMessage::Draw { room_code, op })
    }

    /// Render an operation relayed from another participant.
    pub fn apply_remote(&mut self, op: &DrawOp) {
        log::trace!("Applying remote {} operation", op.tool_name());
        render(&mut self.surface, op);
    }

    /// Apply a relayed message if it is a draw. Returns whether the
    /// surface changed.
    pub fn apply(&mut self, msg: &ServerMessage) -> bool {
        match msg {
            ServerMessage::Draw { op, .. } => {
                self.apply_remote(op);
                true
            }
            _ => false,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    /// Fill the surface with its background. Nothing is emitted.
    pub fn clear(&mut self) {
        self.surface.clear();
    }
}
