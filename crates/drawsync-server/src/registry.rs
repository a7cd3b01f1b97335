//! Room membership table.
//!
//! Rooms own their member sets; a connection only keeps the code of the
//! room it is in. Rooms are created on first join and dropped when their
//! last member leaves.

use drawsync_core::protocol::{ConnectionId, RoomCode};
use std::collections::{BTreeSet, HashMap};

/// Result of [`RoomRegistry::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Room the connection was in before, if it switched rooms.
    pub previous: Option<RoomCode>,
    /// `false` for a repeated join of the room the connection is already in.
    pub changed: bool,
    /// Members of the joined room after the join, including the joiner.
    pub members: Vec<ConnectionId>,
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, BTreeSet<ConnectionId>>,
    membership: HashMap<ConnectionId, RoomCode>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `connection` in `room`, leaving any other room first.
    pub fn join(&mut self, connection: ConnectionId, room: RoomCode) -> JoinOutcome {
        if self.membership.get(&connection) == Some(&room) {
            return JoinOutcome {
                previous: None,
                changed: false,
                members: self.members_of(&room, None),
            };
        }

        let previous = self.leave(connection);
        self.rooms.entry(room.clone()).or_default().insert(connection);
        self.membership.insert(connection, room.clone());

        JoinOutcome {
            previous,
            changed: true,
            members: self.members_of(&room, None),
        }
    }

    /// Remove `connection` from its room. Returns the room it left.
    pub fn leave(&mut self, connection: ConnectionId) -> Option<RoomCode> {
        let room = self.membership.remove(&connection)?;
        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(&connection);
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }
        Some(room)
    }

    /// Current members of `room`, optionally without `except`.
    pub fn members_of(&self, room: &RoomCode, except: Option<ConnectionId>) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .copied()
                    .filter(|id| Some(*id) != except)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn room_of(&self, connection: ConnectionId) -> Option<&RoomCode> {
        self.membership.get(&connection)
    }

    pub fn is_member(&self, connection: ConnectionId, room: &RoomCode) -> bool {
        self.room_of(connection) == Some(room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.membership.len()
    }
}
