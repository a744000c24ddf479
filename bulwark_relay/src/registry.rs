// Room registry: who is in which room, and who hosts it.
//
// Pure bookkeeping with no I/O, owned by the router and mutated only from
// the relay's single event thread. Two maps are kept in step:
// `room_of_connection` (connection → room code) and `rooms` (room code →
// host + members). Every public method leaves them consistent, which gives
// the two invariants the rest of the relay relies on:
//
// - a room in `rooms` has at least one member;
// - its `host` is one of its members.
//
// The registry, not the caller, dissolves a room when its host leaves. That
// keeps "exactly one host per existing room" true between any two calls;
// `election.rs` only decides who to notify about it.

use std::collections::{BTreeMap, BTreeSet};

use bulwark_protocol::{ConnectionId, RoomCode};
use thiserror::Error;

/// The role a connection receives when it joins a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Host,
    Follower,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("already in room {0}")]
    AlreadyInRoom(RoomCode),
    #[error("room {room} is full ({capacity} members)")]
    RoomFull { room: RoomCode, capacity: usize },
}

/// What a `leave` did to the connection's room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Departure {
    /// A follower left; the room and its host remain.
    Follower { room: RoomCode, host: ConnectionId },
    /// The host left; the room is gone and `evicted` were its other members.
    Host {
        room: RoomCode,
        evicted: Vec<ConnectionId>,
    },
}

#[derive(Debug)]
struct Room {
    host: ConnectionId,
    members: BTreeSet<ConnectionId>,
}

/// Connection → room and room → host bookkeeping.
#[derive(Debug)]
pub struct RoomRegistry {
    room_of_connection: BTreeMap<ConnectionId, RoomCode>,
    rooms: BTreeMap<RoomCode, Room>,
    max_room_members: usize,
}

impl RoomRegistry {
    pub fn new(max_room_members: usize) -> Self {
        Self {
            room_of_connection: BTreeMap::new(),
            rooms: BTreeMap::new(),
            max_room_members: max_room_members.max(1),
        }
    }

    /// Add `connection` to `room`. The first member of a room becomes its
    /// host; later members are followers and never change the host.
    pub fn join(&mut self, connection: ConnectionId, room: RoomCode) -> Result<Role, JoinError> {
        if let Some(current) = self.room_of_connection.get(&connection) {
            return Err(JoinError::AlreadyInRoom(current.clone()));
        }

        let role = match self.rooms.get_mut(&room) {
            Some(existing) => {
                if existing.members.len() >= self.max_room_members {
                    return Err(JoinError::RoomFull {
                        room,
                        capacity: self.max_room_members,
                    });
                }
                existing.members.insert(connection);
                Role::Follower
            }
            None => {
                self.rooms.insert(
                    room.clone(),
                    Room {
                        host: connection,
                        members: BTreeSet::from([connection]),
                    },
                );
                Role::Host
            }
        };

        self.room_of_connection.insert(connection, room);
        Ok(role)
    }

    /// Remove `connection` from its room. Returns `None` if it was not in
    /// one. If it was the host, the whole room is dissolved.
    pub fn leave(&mut self, connection: ConnectionId) -> Option<Departure> {
        let room = self.room_of_connection.remove(&connection)?;
        let Some(entry) = self.rooms.get_mut(&room) else {
            // Unreachable while the maps are in step; recover by forgetting
            // the stale membership.
            return None;
        };

        if entry.host == connection {
            let dissolved = self.rooms.remove(&room)?;
            let evicted: Vec<ConnectionId> = dissolved
                .members
                .into_iter()
                .filter(|member| *member != connection)
                .collect();
            for member in &evicted {
                self.room_of_connection.remove(member);
            }
            return Some(Departure::Host { room, evicted });
        }

        entry.members.remove(&connection);
        let host = entry.host;
        Some(Departure::Follower { room, host })
    }

    pub fn host_of(&self, room: &RoomCode) -> Option<ConnectionId> {
        self.rooms.get(room).map(|r| r.host)
    }

    pub fn room_of(&self, connection: ConnectionId) -> Option<&RoomCode> {
        self.room_of_connection.get(&connection)
    }

    /// Members of `room` in ascending ID order (empty if it does not exist).
    pub fn members_of(&self, room: &RoomCode) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|r| r.members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, room: &RoomCode, connection: ConnectionId) -> bool {
        self.room_of_connection.get(&connection) == Some(room)
    }

    pub fn is_host(&self, connection: ConnectionId) -> bool {
        self.room_of(connection)
            .and_then(|room| self.host_of(room))
            .is_some_and(|host| host == connection)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
