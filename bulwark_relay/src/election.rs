// Host election and the consequences of a departure.
//
// Election is trivial (the registry makes the first joiner host); this
// module decides who must be told. On join: a new host gets
// `PromoteToHost`; a follower triggers a snapshot request to the existing
// host. On departure: a departing host means the room is gone and every
// evicted member gets one `RoomClosed`; a departing follower means the host
// gets one `RemovePlayerTowers` so it can evict that follower's towers.
//
// There is no migration. Moving authority to a follower would require the
// follower to hold an authoritative copy of the simulation, which it does
// not; dissolving fails safe instead of desyncing.

use bulwark_protocol::{ConnectionId, RoomCode, ServerMessage};
use tracing::info;

use crate::registry::{Departure, Role, RoomRegistry};
use crate::router::Delivery;
use crate::snapshot::PendingSnapshots;

/// Deliveries caused by `joiner` entering `room` with `role`.
pub fn on_join(
    role: Role,
    joiner: ConnectionId,
    room: &RoomCode,
    registry: &RoomRegistry,
    snapshots: &mut PendingSnapshots,
) -> Vec<Delivery> {
    match role {
        Role::Host => {
            info!(%room, %joiner, "room created");
            vec![Delivery::new(joiner, ServerMessage::PromoteToHost)]
        }
        Role::Follower => {
            let Some(host) = registry.host_of(room) else {
                return Vec::new();
            };
            info!(%room, %joiner, %host, "follower joined, requesting snapshot");
            snapshots.request(joiner, room.clone());
            vec![Delivery::new(host, ServerMessage::GetState { for_id: joiner })]
        }
    }
}

/// Deliveries caused by `leaver` leaving its room.
pub fn on_departure(
    leaver: ConnectionId,
    departure: Departure,
    snapshots: &mut PendingSnapshots,
) -> Vec<Delivery> {
    snapshots.cancel(leaver);
    match departure {
        Departure::Follower { room, host } => {
            info!(%room, %leaver, "follower left");
            vec![Delivery::new(
                host,
                ServerMessage::RemovePlayerTowers {
                    connection_id: leaver,
                },
            )]
        }
        Departure::Host { room, evicted } => {
            info!(%room, host = %leaver, evicted = evicted.len(), "host left, room dissolved");
            snapshots.cancel_room(&room);
            evicted
                .into_iter()
                .map(|member| Delivery::new(member, ServerMessage::RoomClosed))
                .collect()
        }
    }
}
