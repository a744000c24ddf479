// Outstanding snapshot requests for joining followers.
//
// When a follower joins a room that already has a host, the router sends the
// host `GetState { for_id }` and records `joiner → room` here. The host's
// `ReturnState` is forwarded only if it answers an outstanding request from
// the host of that same room, and the entry is consumed when it is
// forwarded, so a joiner receives at most one `SetState`.
//
// Only the fact that a request is pending is stored; snapshot payloads pass
// straight through. If the host never answers, the entry stays until the
// joiner leaves or the room dissolves.

use std::collections::BTreeMap;

use bulwark_protocol::{ConnectionId, RoomCode};

#[derive(Debug, Default)]
pub struct PendingSnapshots {
    pending: BTreeMap<ConnectionId, RoomCode>,
}

impl PendingSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `joiner` is waiting for a snapshot of `room`.
    pub fn request(&mut self, joiner: ConnectionId, room: RoomCode) {
        self.pending.insert(joiner, room);
    }

    /// Consume the request for `joiner` if it is waiting on `room`. Returns
    /// whether a reply should be forwarded.
    pub fn fulfil(&mut self, joiner: ConnectionId, room: &RoomCode) -> bool {
        if self.pending.get(&joiner) != Some(room) {
            return false;
        }
        self.pending.remove(&joiner);
        true
    }

    /// Forget any request for a connection that left its room.
    pub fn cancel(&mut self, joiner: ConnectionId) {
        self.pending.remove(&joiner);
    }

    /// Forget every request into a dissolved room.
    pub fn cancel_room(&mut self, room: &RoomCode) {
        self.pending.retain(|_, pending_room| pending_room != room);
    }

    pub fn is_pending(&self, joiner: ConnectionId) -> bool {
        self.pending.contains_key(&joiner)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
