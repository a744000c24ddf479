// Core ID types for the multiplayer protocol.
//
// `ConnectionId` is assigned by the relay when a TCP connection is accepted
// and is the only identity a participant has: tower ownership, snapshot
// routing, and follower cleanup all key on it. `EnemyId` and `ProjectileId`
// are assigned by the room's host and are only meaningful inside that room.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Relay-assigned connection ID. Unique for the lifetime of the relay
/// process; never reused after the connection closes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Host-assigned enemy ID, monotonically increasing within a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

/// Host-assigned projectile ID, monotonically increasing within a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(pub u32);
