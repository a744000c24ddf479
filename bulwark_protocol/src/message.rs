// Protocol messages for client-relay communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by a connection to the relay.
// - `ServerMessage`: sent by the relay to one or more connections.
//
// Most game events come in pairs: the host emits `Sync*` and the relay
// re-emits the corresponding `ServerMessage` to the rest of the room. Tower
// placement and removal have a third leg because a follower may only ask:
// `RequestPlaceTower` → `HostPlaceTower` → `SyncPlaceTower` (confirm) or
// `FailedPlaceTower` (refuse) → `PlaceTower` / `RefundPlaceTower`.
//
// The relay classifies each `ClientMessage` by `Authority` (see
// `bulwark_relay::router`); the enums themselves carry no routing rules.

use serde::{Deserialize, Serialize};

use crate::records::{EnemyRecord, HostState, ProjectileRecord};
use crate::types::{ConnectionId, EnemyId, ProjectileId};

/// Messages sent by a connection to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the named room, creating it if it does not exist.
    JoinRoom { room_code: String },
    /// Leave the current room but keep the connection open.
    LeaveRoom,
    /// Begin wave spawning for the whole room.
    Start,
    /// Host's answer to `GetState`.
    ReturnState {
        for_id: ConnectionId,
        state: HostState,
    },
    /// Follower asks the host to place a tower.
    RequestPlaceTower { x: u32, y: u32, tower_index: u32 },
    /// Host confirms a placement (its own or a follower's).
    SyncPlaceTower {
        x: u32,
        y: u32,
        tower_index: u32,
        owner_id: ConnectionId,
    },
    /// Host refuses a follower's placement request.
    FailedPlaceTower {
        tower_index: u32,
        for_id: ConnectionId,
    },
    /// Follower asks the host to remove a tower.
    RequestRemoveTower { x: u32, y: u32 },
    /// Host confirms a tower removal.
    SyncRemoveTower { x: u32, y: u32 },
    SyncSpawnEnemy { enemy: EnemyRecord },
    SyncRemoveEnemy { id: EnemyId },
    SyncSpawnProjectile { projectile: ProjectileRecord },
    SyncRemoveProjectile { id: ProjectileId },
    SyncEnemyMoving { id: EnemyId, moving: bool },
    SyncWave { wave: u32, active: bool },
    /// Connection is closing gracefully.
    Goodbye,
}

impl ClientMessage {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::JoinRoom { .. } => "JoinRoom",
            ClientMessage::LeaveRoom => "LeaveRoom",
            ClientMessage::Start => "Start",
            ClientMessage::ReturnState { .. } => "ReturnState",
            ClientMessage::RequestPlaceTower { .. } => "RequestPlaceTower",
            ClientMessage::SyncPlaceTower { .. } => "SyncPlaceTower",
            ClientMessage::FailedPlaceTower { .. } => "FailedPlaceTower",
            ClientMessage::RequestRemoveTower { .. } => "RequestRemoveTower",
            ClientMessage::SyncRemoveTower { .. } => "SyncRemoveTower",
            ClientMessage::SyncSpawnEnemy { .. } => "SyncSpawnEnemy",
            ClientMessage::SyncRemoveEnemy { .. } => "SyncRemoveEnemy",
            ClientMessage::SyncSpawnProjectile { .. } => "SyncSpawnProjectile",
            ClientMessage::SyncRemoveProjectile { .. } => "SyncRemoveProjectile",
            ClientMessage::SyncEnemyMoving { .. } => "SyncEnemyMoving",
            ClientMessage::SyncWave { .. } => "SyncWave",
            ClientMessage::Goodbye => "Goodbye",
        }
    }
}

/// Messages sent by the relay to a connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// First message on every accepted connection.
    Welcome { connection_id: ConnectionId },
    /// Connection refused; the relay closes it right after.
    Rejected { reason: String },
    /// `JoinRoom` refused (invalid code, full room). The connection stays
    /// open and may try again.
    JoinRejected { reason: String },
    /// You created the room and are its host.
    PromoteToHost,
    /// The host left; you are no longer in any room.
    RoomClosed,
    /// (To host) send a snapshot for this joiner.
    GetState { for_id: ConnectionId },
    /// (To joiner) the host's snapshot.
    SetState { state: HostState },
    Start,
    /// (To host) a follower wants a tower placed.
    HostPlaceTower {
        x: u32,
        y: u32,
        tower_index: u32,
        requester: ConnectionId,
    },
    PlaceTower {
        x: u32,
        y: u32,
        tower_index: u32,
        owner_id: ConnectionId,
    },
    /// (To requester) placement refused; release the reserved slot.
    RefundPlaceTower { tower_index: u32 },
    /// (To host) a follower wants a tower removed.
    HostRemoveTower {
        x: u32,
        y: u32,
        requester: ConnectionId,
    },
    RemoveTower { x: u32, y: u32 },
    SpawnEnemy { enemy: EnemyRecord },
    RemoveEnemy { id: EnemyId },
    SpawnProjectile { projectile: ProjectileRecord },
    RemoveProjectile { id: ProjectileId },
    SetEnemyMoving { id: EnemyId, moving: bool },
    SetWave { wave: u32, active: bool },
    /// (To host) a follower left; remove every tower it owns.
    RemovePlayerTowers { connection_id: ConnectionId },
}
