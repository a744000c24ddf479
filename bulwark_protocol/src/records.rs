// Record shapes for host-owned simulation objects.
//
// These are the payloads of spawn events and of the `HostState` snapshot a
// joining follower receives. The relay never looks inside them; only the
// sync adapter (`bulwark_sync`) interprets them.
//
// Tower ownership lives here too, because both sides need the same rule:
// the host applies `TowerOwner::permits` before honouring a removal request,
// and a client uses `TowerOwner::is_local_to` to decide whether a click on
// an occupied cell may touch it at all.

use serde::{Deserialize, Serialize};

use crate::types::{ConnectionId, EnemyId, ProjectileId};

/// Who may remove (and reclaim the inventory slot of) a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerOwner {
    /// Not remotely owned. Only produced in non-networked play.
    Local,
    /// Owned by the connection that placed (or requested) it.
    Connection(ConnectionId),
}

impl TowerOwner {
    /// Ownership predicate for networked removal: the owner itself or the
    /// room's current host. `Local` towers are never remotely removable.
    pub fn permits(self, requester: ConnectionId, host: Option<ConnectionId>) -> bool {
        match self {
            TowerOwner::Local => false,
            TowerOwner::Connection(owner) => owner == requester || host == Some(requester),
        }
    }

    /// Whether the participant identified by `local_id` (`None` when
    /// offline) owns this tower.
    pub fn is_local_to(self, local_id: Option<ConnectionId>) -> bool {
        match self {
            TowerOwner::Local => true,
            TowerOwner::Connection(owner) => local_id == Some(owner),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyRecord {
    pub stats_index: u32,
    pub x: f32,
    pub lane: u32,
    pub id: EnemyId,
    pub moving: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileRecord {
    pub tower_stats_index: u32,
    pub x: f32,
    pub y: f32,
    pub id: ProjectileId,
}

/// A placed tower. `(x, y)` is a grid cell, unique among towers in a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerRecord {
    pub stats_index: u32,
    pub x: u32,
    pub y: u32,
    pub owner: TowerOwner,
}

/// Full point-in-time copy of the host's simulation, sent once to a joiner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostState {
    pub is_started: bool,
    pub wave: u32,
    pub enemy_spawns: Vec<EnemyRecord>,
    pub projectile_spawns: Vec<ProjectileRecord>,
    pub tower_spawns: Vec<TowerRecord>,
}
