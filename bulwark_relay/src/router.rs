// Relay router: turns one inbound event into zero or more deliveries.
//
// `Router` owns the `RoomRegistry` and `PendingSnapshots` and is driven by
// the server's single event thread, one event at a time. It performs no
// I/O: every method returns the `Delivery` list for the caller to write.
// That makes each registry mutation and forwarding decision atomic with
// respect to other events without any locking.
//
// For each event the router:
// 1. handles membership events (`JoinRoom`, `LeaveRoom`, `Goodbye`) directly;
// 2. resolves the sender's room and that room's host;
// 3. checks the event's `Authority` against the sender's role;
// 4. forwards as a directed message or a room broadcast.
//
// Any event that fails a check is dropped with a `debug!` line and no
// delivery. A follower gets no signal that its forged host event was
// ignored.

use bulwark_protocol::{ClientMessage, ConnectionId, RoomCode, ServerMessage};
use tracing::debug;

use crate::election;
use crate::registry::{JoinError, RoomRegistry};
use crate::snapshot::PendingSnapshots;

/// A message addressed to one connection.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub message: ServerMessage,
}

impl Delivery {
    pub fn new(to: ConnectionId, message: ServerMessage) -> Self {
        Self { to, message }
    }
}

/// Who may send an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    /// Join/leave; valid whether or not the sender is in a room.
    Membership,
    /// Any member of a room.
    AnyMember,
    /// Members other than the host (the host acts directly instead).
    FollowerOnly,
    /// Only the room's current host.
    HostOnly,
}

/// Classify an inbound event.
pub fn authority(message: &ClientMessage) -> Authority {
    match message {
        ClientMessage::JoinRoom { .. } | ClientMessage::LeaveRoom | ClientMessage::Goodbye => {
            Authority::Membership
        }
        ClientMessage::Start => Authority::AnyMember,
        ClientMessage::RequestPlaceTower { .. } | ClientMessage::RequestRemoveTower { .. } => {
            Authority::FollowerOnly
        }
        ClientMessage::ReturnState { .. }
        | ClientMessage::SyncPlaceTower { .. }
        | ClientMessage::FailedPlaceTower { .. }
        | ClientMessage::SyncRemoveTower { .. }
        | ClientMessage::SyncSpawnEnemy { .. }
        | ClientMessage::SyncRemoveEnemy { .. }
        | ClientMessage::SyncSpawnProjectile { .. }
        | ClientMessage::SyncRemoveProjectile { .. }
        | ClientMessage::SyncEnemyMoving { .. }
        | ClientMessage::SyncWave { .. } => Authority::HostOnly,
    }
}

/// The sender's room as resolved for one event.
struct RoomContext {
    room: RoomCode,
    host: ConnectionId,
}

pub struct Router {
    registry: RoomRegistry,
    snapshots: PendingSnapshots,
    max_room_code_len: usize,
}

impl Router {
    pub fn new(max_room_members: usize, max_room_code_len: usize) -> Self {
        Self {
            registry: RoomRegistry::new(max_room_members),
            snapshots: PendingSnapshots::new(),
            max_room_code_len,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn snapshots(&self) -> &PendingSnapshots {
        &self.snapshots
    }

    /// A transport-level connection was accepted.
    pub fn connect(&mut self, connection: ConnectionId) -> Vec<Delivery> {
        vec![Delivery::new(
            connection,
            ServerMessage::Welcome {
                connection_id: connection,
            },
        )]
    }

    /// A transport-level connection closed (gracefully or not). Same effect
    /// as an explicit `LeaveRoom`.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Vec<Delivery> {
        self.leave(connection)
    }

    /// Route one inbound event from `sender`.
    pub fn handle(&mut self, sender: ConnectionId, message: ClientMessage) -> Vec<Delivery> {
        let authority = authority(&message);
        if authority == Authority::Membership {
            return match message {
                ClientMessage::JoinRoom { room_code } => self.join(sender, &room_code),
                _ => self.leave(sender),
            };
        }

        let Some(ctx) = self.authorize(sender, &message, authority) else {
            return Vec::new();
        };
        self.forward(sender, ctx, message)
    }

    fn join(&mut self, sender: ConnectionId, raw_code: &str) -> Vec<Delivery> {
        if let Some(current) = self.registry.room_of(sender) {
            debug!(%sender, %current, "duplicate join ignored");
            return Vec::new();
        }

        let room = match RoomCode::parse(raw_code, self.max_room_code_len) {
            Ok(room) => room,
            Err(e) => {
                debug!(%sender, error = %e, "join with invalid room code");
                return vec![Delivery::new(
                    sender,
                    ServerMessage::JoinRejected {
                        reason: e.to_string(),
                    },
                )];
            }
        };

        match self.registry.join(sender, room.clone()) {
            Ok(role) => {
                election::on_join(role, sender, &room, &self.registry, &mut self.snapshots)
            }
            Err(JoinError::AlreadyInRoom(_)) => Vec::new(),
            Err(e @ JoinError::RoomFull { .. }) => {
                debug!(%sender, error = %e, "join refused");
                vec![Delivery::new(
                    sender,
                    ServerMessage::JoinRejected {
                        reason: e.to_string(),
                    },
                )]
            }
        }
    }

    fn leave(&mut self, sender: ConnectionId) -> Vec<Delivery> {
        match self.registry.leave(sender) {
            Some(departure) => election::on_departure(sender, departure, &mut self.snapshots),
            None => {
                self.snapshots.cancel(sender);
                Vec::new()
            }
        }
    }

    /// Resolve the sender's room and check its role against `authority`.
    fn authorize(
        &self,
        sender: ConnectionId,
        message: &ClientMessage,
        authority: Authority,
    ) -> Option<RoomContext> {
        let Some(room) = self.registry.room_of(sender) else {
            debug!(%sender, event = message.name(), "dropped: sender not in a room");
            return None;
        };
        let Some(host) = self.registry.host_of(room) else {
            debug!(%sender, %room, event = message.name(), "dropped: room has no host");
            return None;
        };

        let is_host = host == sender;
        let allowed = match authority {
            Authority::HostOnly => is_host,
            Authority::FollowerOnly => !is_host,
            Authority::AnyMember | Authority::Membership => true,
        };
        if !allowed {
            debug!(%sender, %room, event = message.name(), ?authority, "dropped: unauthorized");
            return None;
        }

        Some(RoomContext {
            room: room.clone(),
            host,
        })
    }

    fn forward(
        &mut self,
        sender: ConnectionId,
        ctx: RoomContext,
        message: ClientMessage,
    ) -> Vec<Delivery> {
        let RoomContext { room, host } = ctx;
        match message {
            ClientMessage::Start => self.broadcast(&room, None, ServerMessage::Start),
            ClientMessage::ReturnState { for_id, state } => {
                if !self.snapshots.fulfil(for_id, &room) {
                    debug!(%sender, %for_id, %room, "dropped: unrequested snapshot");
                    return Vec::new();
                }
                vec![Delivery::new(for_id, ServerMessage::SetState { state })]
            }
            ClientMessage::RequestPlaceTower { x, y, tower_index } => vec![Delivery::new(
                host,
                ServerMessage::HostPlaceTower {
                    x,
                    y,
                    tower_index,
                    requester: sender,
                },
            )],
            ClientMessage::SyncPlaceTower {
                x,
                y,
                tower_index,
                owner_id,
            } => {
                if !self.registry.is_member(&room, owner_id) {
                    debug!(%sender, %owner_id, %room, "dropped: tower owner not in room");
                    return Vec::new();
                }
                self.broadcast(
                    &room,
                    Some(sender),
                    ServerMessage::PlaceTower {
                        x,
                        y,
                        tower_index,
                        owner_id,
                    },
                )
            }
            ClientMessage::FailedPlaceTower {
                tower_index,
                for_id,
            } => {
                if for_id == sender || !self.registry.is_member(&room, for_id) {
                    debug!(%sender, %for_id, %room, "dropped: refusal for non-follower");
                    return Vec::new();
                }
                vec![Delivery::new(
                    for_id,
                    ServerMessage::RefundPlaceTower { tower_index },
                )]
            }
            ClientMessage::RequestRemoveTower { x, y } => vec![Delivery::new(
                host,
                ServerMessage::HostRemoveTower {
                    x,
                    y,
                    requester: sender,
                },
            )],
            ClientMessage::SyncRemoveTower { x, y } => {
                self.broadcast(&room, Some(sender), ServerMessage::RemoveTower { x, y })
            }
            ClientMessage::SyncSpawnEnemy { enemy } => {
                self.broadcast(&room, Some(sender), ServerMessage::SpawnEnemy { enemy })
            }
            ClientMessage::SyncRemoveEnemy { id } => {
                self.broadcast(&room, Some(sender), ServerMessage::RemoveEnemy { id })
            }
            ClientMessage::SyncSpawnProjectile { projectile } => self.broadcast(
                &room,
                Some(sender),
                ServerMessage::SpawnProjectile { projectile },
            ),
            ClientMessage::SyncRemoveProjectile { id } => {
                self.broadcast(&room, Some(sender), ServerMessage::RemoveProjectile { id })
            }
            ClientMessage::SyncEnemyMoving { id, moving } => self.broadcast(
                &room,
                Some(sender),
                ServerMessage::SetEnemyMoving { id, moving },
            ),
            ClientMessage::SyncWave { wave, active } => self.broadcast(
                &room,
                Some(sender),
                ServerMessage::SetWave { wave, active },
            ),
            // Membership events never reach `forward`.
            ClientMessage::JoinRoom { .. } | ClientMessage::LeaveRoom | ClientMessage::Goodbye => {
                Vec::new()
            }
        }
    }

    /// One delivery per member of `room`, skipping `except`.
    fn broadcast(
        &self,
        room: &RoomCode,
        except: Option<ConnectionId>,
        message: ServerMessage,
    ) -> Vec<Delivery> {
        self.registry
            .members_of(room)
            .into_iter()
            .filter(|member| Some(*member) != except)
            .map(|member| Delivery::new(member, message.clone()))
            .collect()
    }
}
