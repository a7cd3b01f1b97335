//! Room-scoped fan-out of client operations.
//!
//! The relay owns the room registry and one outbound queue per open
//! connection. Routing takes a membership snapshot under the registry lock,
//! encodes the outgoing frame once, and pushes it onto each recipient's
//! queue. A writer task per connection drains its queue, so a slow peer
//! never holds up delivery to the others.

use crate::registry::RoomRegistry;
use dashmap::DashMap;
use drawsync_core::protocol::{
    ClientMessage, ConnectionId, ProtocolError, RoomCode, ServerMessage,
};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// An encoded frame ready to be written to a socket.
pub type Frame = Arc<str>;

/// Why an inbound operation was not routed. Never reported to the sender.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("message has no room code")]
    MissingRoom,
    #[error("connection {connection} is not a member of room {room}")]
    NotMember {
        connection: ConnectionId,
        room: RoomCode,
    },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Default)]
pub struct Relay {
    registry: Mutex<RoomRegistry>,
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<Frame>>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection: allocate its id and outbound queue.
    pub fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Frame>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(id, tx);
        (id, rx)
    }

    /// Decode one text frame from `sender` and route it. Bad frames and
    /// unroutable operations are logged and dropped.
    pub fn handle_text(&self, sender: ConnectionId, text: &str) {
        let msg = match ClientMessage::decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Invalid message from {}: {}", sender, e);
                return;
            }
        };
        if let Err(e) = self.route(sender, msg) {
            debug!("Dropped message from {}: {}", sender, e);
        }
    }

    /// Route a decoded message. Returns the number of frames queued.
    pub fn route(&self, sender: ConnectionId, msg: ClientMessage) -> Result<usize, RoutingError> {
        if msg.room_code().is_empty() {
            return Err(RoutingError::MissingRoom);
        }

        match msg {
            ClientMessage::Join { room_code, user } => self.join(sender, room_code, user),
            ClientMessage::Draw { room_code, op } => {
                let recipients = self.peers_of(sender, &room_code)?;
                let frame = encode(&ServerMessage::Draw { room_code, op })?;
                Ok(self.deliver(&recipients, &frame))
            }
            ClientMessage::Cursor { room_code, x, y } => {
                let recipients = self.peers_of(sender, &room_code)?;
                let frame = encode(&ServerMessage::Cursor { id: sender, x, y })?;
                Ok(self.deliver(&recipients, &frame))
            }
            ClientMessage::Chat { room_code, message } => {
                let recipients = self.peers_of(sender, &room_code)?;
                let frame = encode(&ServerMessage::Chat { message })?;
                Ok(self.deliver(&recipients, &frame))
            }
        }
    }

    /// Close a connection: drop its queue, leave its room and tell the
    /// remaining members of that room.
    pub fn disconnect(&self, id: ConnectionId) {
        self.connections.remove(&id);
        let (room, remaining) = {
            let mut registry = self.registry();
            let Some(room) = registry.leave(id) else {
                return;
            };
            let remaining = registry.members_of(&room, None);
            (room, remaining)
        };

        info!("Connection {} left room {}", id, room);
        match encode(&ServerMessage::PresenceLeave { id }) {
            Ok(frame) => {
                self.deliver(&remaining, &frame);
            }
            Err(e) => warn!("Failed to encode presence leave: {}", e),
        }
    }

    pub fn room_of(&self, id: ConnectionId) -> Option<RoomCode> {
        self.registry().room_of(id).cloned()
    }

    pub fn members_of(&self, room: &RoomCode) -> Vec<ConnectionId> {
        self.registry().members_of(room, None)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn join(&self, sender: ConnectionId, room: RoomCode, user: String) -> Result<usize, RoutingError> {
        let (outcome, others, left_behind) = {
            let mut registry = self.registry();
            let outcome = registry.join(sender, room.clone());
            let others = registry.members_of(&room, Some(sender));
            let left_behind = outcome
                .previous
                .as_ref()
                .map(|prev| registry.members_of(prev, None))
                .unwrap_or_default();
            (outcome, others, left_behind)
        };

        if outcome.changed {
            info!("Connection {} ({}) joined room {}", sender, user, room);
        }

        let mut sent = self.deliver(
            &[sender],
            &encode(&ServerMessage::Joined {
                room_code: room,
                id: sender,
                members: outcome.members,
            })?,
        );
        if outcome.changed {
            let frame = encode(&ServerMessage::UserJoined { user, id: sender })?;
            sent += self.deliver(&others, &frame);
        }
        if let Some(previous) = outcome.previous {
            debug!("Connection {} switched away from room {}", sender, previous);
            let frame = encode(&ServerMessage::PresenceLeave { id: sender })?;
            sent += self.deliver(&left_behind, &frame);
        }
        Ok(sent)
    }

    /// Members of `room` other than `sender`, provided `sender` is one.
    fn peers_of(&self, sender: ConnectionId, room: &RoomCode) -> Result<Vec<ConnectionId>, RoutingError> {
        let registry = self.registry();
        if !registry.is_member(sender, room) {
            return Err(RoutingError::NotMember {
                connection: sender,
                room: room.clone(),
            });
        }
        Ok(registry.members_of(room, Some(sender)))
    }

    fn deliver(&self, recipients: &[ConnectionId], frame: &Frame) -> usize {
        recipients
            .iter()
            .filter(|id| match self.connections.get(*id) {
                Some(tx) => tx.send(Arc::clone(frame)).is_ok(),
                None => false,
            })
            .count()
    }

    fn registry(&self) -> MutexGuard<'_, RoomRegistry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn encode(msg: &ServerMessage) -> Result<Frame, ProtocolError> {
    Ok(Arc::from(msg.encode()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawsync_core::protocol::{ChatMessage, DrawOp, HexColor, LineOp};
    use kurbo::Point;

    fn drain(rx: &mut mpsc::UnboundedReceiver<Frame>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(ServerMessage::decode(&frame).unwrap());
        }
        out
    }

    fn join(relay: &Relay, id: ConnectionId, room: &str, user: &str) {
        relay
            .route(id, ClientMessage::Join { room_code: room.into(), user: user.into() })
            .unwrap();
    }

    fn red_line(room: &str) -> ClientMessage {
        ClientMessage::Draw {
            room_code: room.into(),
            op: DrawOp::Line(LineOp::new(
                Point::new(10.0, 10.0),
                Point::new(50.0, 50.0),
                HexColor::rgb(255, 0, 0),
                2.0,
            )),
        }
    }

    #[test]
    fn test_join_acknowledges_and_notifies() {
        let relay = Relay::new();
        let (a, mut rx_a) = relay.register();
        let (b, mut rx_b) = relay.register();

        join(&relay, a, "ABC123", "alice");
        join(&relay, b, "ABC123", "bob");

        let to_a = drain(&mut rx_a);
        assert!(matches!(to_a[0], ServerMessage::Joined { id, .. } if id == a));
        assert_eq!(to_a[1], ServerMessage::UserJoined { user: "bob".into(), id: b });

        let to_b = drain(&mut rx_b);
        assert_eq!(to_b.len(), 1);
        match &to_b[0] {
            ServerMessage::Joined { room_code, id, members } => {
                assert_eq!(room_code.as_str(), "ABC123");
                assert_eq!(*id, b);
                assert_eq!(members.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_draw_exactly_once_without_echo() {
        let relay = Relay::new();
        let (a, mut rx_a) = relay.register();
        let (b, mut rx_b) = relay.register();
        let (c, mut rx_c) = relay.register();
        for (id, name) in [(a, "a"), (b, "b"), (c, "c")] {
            join(&relay, id, "ABC123", name);
        }
        drain(&mut rx_a);
        drain(&mut rx_b);
        drain(&mut rx_c);

        assert_eq!(relay.route(a, red_line("ABC123")).unwrap(), 2);

        assert!(drain(&mut rx_a).is_empty());
        for rx in [&mut rx_b, &mut rx_c] {
            let got = drain(rx);
            assert_eq!(got.len(), 1);
            assert!(matches!(&got[0], ServerMessage::Draw { op: DrawOp::Line(_), .. }));
        }
    }

    #[test]
    fn test_rooms_are_isolated() {
        let relay = Relay::new();
        let (a, _rx_a) = relay.register();
        let (b, mut rx_b) = relay.register();
        join(&relay, a, "ONE", "a");
        join(&relay, b, "TWO", "b");
        drain(&mut rx_b);

        assert_eq!(relay.route(a, red_line("ONE")).unwrap(), 0);
        relay
            .route(a, ClientMessage::Chat { room_code: "ONE".into(), message: ChatMessage::now("a", "hi") })
            .unwrap();
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_non_member_and_missing_room_dropped() {
        let relay = Relay::new();
        let (a, _rx_a) = relay.register();
        let (b, mut rx_b) = relay.register();
        join(&relay, b, "ABC123", "b");
        drain(&mut rx_b);

        assert!(matches!(relay.route(a, red_line("ABC123")), Err(RoutingError::NotMember { .. })));
        assert!(matches!(relay.route(a, red_line("")), Err(RoutingError::MissingRoom)));
        relay.handle_text(a, "{\"type\":\"teleport\"}");
        relay.handle_text(a, r#"{"type":"cursor","x":1,"y":2}"#);
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_cursor_carries_sender_id() {
        let relay = Relay::new();
        let (a, _rx_a) = relay.register();
        let (b, mut rx_b) = relay.register();
        join(&relay, a, "ABC123", "a");
        join(&relay, b, "ABC123", "b");
        drain(&mut rx_b);

        relay.handle_text(a, r#"{"type":"cursor","roomCode":"ABC123","x":12.5,"y":40}"#);
        assert_eq!(drain(&mut rx_b), vec![ServerMessage::Cursor { id: a, x: 12.5, y: 40.0 }]);
    }

    #[test]
    fn test_disconnect_presence_leave_is_room_scoped() {
        let relay = Relay::new();
        let (a, _rx_a) = relay.register();
        let (b, mut rx_b) = relay.register();
        let (c, mut rx_c) = relay.register();
        join(&relay, a, "ONE", "a");
        join(&relay, b, "ONE", "b");
        join(&relay, c, "TWO", "c");
        drain(&mut rx_b);
        drain(&mut rx_c);

        relay.disconnect(a);
        assert_eq!(drain(&mut rx_b), vec![ServerMessage::PresenceLeave { id: a }]);
        assert!(drain(&mut rx_c).is_empty());
        assert_eq!(relay.room_of(a), None);
        assert_eq!(relay.connection_count(), 2);
    }

    #[test]
    fn test_room_switch_notifies_old_room() {
        let relay = Relay::new();
        let (a, _rx_a) = relay.register();
        let (b, mut rx_b) = relay.register();
        let (c, mut rx_c) = relay.register();
        join(&relay, a, "ONE", "a");
        join(&relay, b, "ONE", "b");
        join(&relay, c, "TWO", "c");
        drain(&mut rx_b);
        drain(&mut rx_c);

        join(&relay, a, "TWO", "a");
        assert_eq!(drain(&mut rx_b), vec![ServerMessage::PresenceLeave { id: a }]);
        assert_eq!(drain(&mut rx_c), vec![ServerMessage::UserJoined { user: "a".into(), id: a }]);
        assert_eq!(relay.members_of(&"ONE".into()), vec![b]);
    }

    #[test]
    fn test_repeated_join_does_not_renotify() {
        let relay = Relay::new();
        let (a, mut rx_a) = relay.register();
        let (b, mut rx_b) = relay.register();
        join(&relay, a, "ABC123", "a");
        join(&relay, b, "ABC123", "b");
        drain(&mut rx_a);
        drain(&mut rx_b);

        join(&relay, b, "ABC123", "b");
        assert!(drain(&mut rx_a).is_empty());
        assert!(matches!(drain(&mut rx_b).as_slice(), [ServerMessage::Joined { .. }]));
    }
}
