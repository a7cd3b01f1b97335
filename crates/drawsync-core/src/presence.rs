//! Remote cursor presence, tracked client-side.
//!
//! Positions are last-write-wins and never expire on their own: an entry
//! disappears only when the relay reports that its connection closed.

use crate::protocol::ConnectionId;
use kurbo::Point;
use std::collections::HashMap;

/// Last-known cursor position and display name of each remote participant.
#[derive(Debug, Default, Clone)]
pub struct PresenceTracker {
    cursors: HashMap<ConnectionId, Point>,
    names: HashMap<ConnectionId, String>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a relayed cursor position, replacing any previous one.
    pub fn update_cursor(&mut self, id: ConnectionId, x: f64, y: f64) {
        self.cursors.insert(id, Point::new(x, y));
    }

    /// Remember the display name announced for a participant.
    pub fn set_name(&mut self, id: ConnectionId, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    /// Forget a participant whose channel closed.
    /// Returns true if a cursor was removed.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        self.names.remove(&id);
        self.cursors.remove(&id).is_some()
    }

    /// Drop every entry (our own channel went away).
    pub fn clear(&mut self) {
        self.cursors.clear();
        self.names.clear();
    }

    pub fn cursor(&self, id: ConnectionId) -> Option<Point> {
        self.cursors.get(&id).copied()
    }

    pub fn name(&self, id: ConnectionId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.cursors.contains_key(&id)
    }

    pub fn cursors(&self) -> impl Iterator<Item = (ConnectionId, Point)> + '_ {
        self.cursors.iter().map(|(id, p)| (*id, *p))
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut presence = PresenceTracker::new();
        let id = ConnectionId::new();

        presence.update_cursor(id, 10.0, 20.0);
        presence.update_cursor(id, 30.0, 40.0);

        assert_eq!(presence.len(), 1);
        assert_eq!(presence.cursor(id), Some(Point::new(30.0, 40.0)));
    }

    #[test]
    fn test_remove_on_leave() {
        let mut presence = PresenceTracker::new();
        let stays = ConnectionId::new();
        let leaves = ConnectionId::new();
        presence.update_cursor(stays, 1.0, 1.0);
        presence.update_cursor(leaves, 2.0, 2.0);
        presence.set_name(leaves, "Bob");

        assert!(presence.remove(leaves));
        assert!(!presence.contains(leaves));
        assert!(presence.name(leaves).is_none());
        assert!(presence.contains(stays));
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut presence = PresenceTracker::new();
        assert!(!presence.remove(ConnectionId::new()));
        assert!(presence.is_empty());
    }

    #[test]
    fn test_name_without_cursor() {
        let mut presence = PresenceTracker::new();
        let id = ConnectionId::new();
        presence.set_name(id, "Ada");
        assert_eq!(presence.name(id), Some("Ada"));
        assert!(presence.cursor(id).is_none());
    }
}
