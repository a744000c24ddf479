// End-to-end integration tests for the multiplayer pipeline.
//
// Each test starts a real relay server, connects real NetClient instances
// (via TestGameClient), and verifies the full path:
// local action → relay → host → relay → every participant's mirror.
//
// These tests exercise the same code paths as the live game (NetClient from
// the relay crate, SyncAdapter from the sync crate). The only test-specific
// code is the synchronous polling wrappers in TestGameClient.

use std::time::Duration;

use bulwark_protocol::{
    ClientMessage, EnemyId, EnemyRecord, HostState, ServerMessage, TowerOwner, TowerRecord,
};
use bulwark_relay::server::{RelayConfig, RelayHandle, start_relay};
use bulwark_sync::{Membership, PlacementError};
use multiplayer_tests::TestGameClient;

/// Long enough for a forwarded event to arrive if one were going to.
const QUIET_WINDOW: Duration = Duration::from_millis(200);

fn start_test_relay() -> (RelayHandle, std::net::SocketAddr) {
    let config = RelayConfig {
        port: 0,
        ..RelayConfig::default()
    };
    start_relay(config).unwrap()
}

/// `follower` joins `room`; the host answers the snapshot request and the
/// follower applies it.
fn join_as_follower(host: &mut TestGameClient, follower: &mut TestGameClient, room: &str) {
    follower.join(room);
    host.poll_until("GetState", |m| matches!(m, ServerMessage::GetState { .. }));
    follower.poll_until("SetState", |m| matches!(m, ServerMessage::SetState { .. }));
}

fn is_place(m: &ServerMessage) -> bool {
    matches!(m, ServerMessage::PlaceTower { .. })
}

fn is_host_place(m: &ServerMessage) -> bool {
    matches!(m, ServerMessage::HostPlaceTower { .. })
}

fn towers(client: &TestGameClient) -> Vec<TowerRecord> {
    client.sync.towers().towers().copied().collect()
}

// ---------------------------------------------------------------------------
// Test scenarios
// ---------------------------------------------------------------------------

/// A creates "ABCD", B joins and receives exactly A's (empty) state.
#[test]
fn joiner_receives_host_snapshot() {
    let (handle, addr) = start_test_relay();
    let mut a = TestGameClient::connect(addr, 2);
    let mut b = TestGameClient::connect(addr, 2);

    a.join_as_host("ABCD");
    assert!(a.sync.is_host());

    b.join("ABCD");
    let request = a.poll_until("GetState", |m| matches!(m, ServerMessage::GetState { .. }));
    assert_eq!(request, ServerMessage::GetState { for_id: b.id() });

    let received = b.poll_until("SetState", |m| matches!(m, ServerMessage::SetState { .. }));
    assert_eq!(
        received,
        ServerMessage::SetState {
            state: HostState {
                is_started: false,
                wave: 1,
                enemy_spawns: vec![],
                projectile_spawns: vec![],
                tower_spawns: vec![],
            }
        }
    );
    assert!(b.drain_for(QUIET_WINDOW).is_empty());
    assert_eq!(b.sync.membership(), Membership::Joined { host: false });

    a.disconnect();
    b.disconnect();
    handle.stop();
}

/// B requests tower 2 at (3,1); A confirms; both end with B's tower.
#[test]
fn follower_tower_request_is_confirmed_everywhere() {
    let (handle, addr) = start_test_relay();
    let mut a = TestGameClient::connect(addr, 2);
    let mut b = TestGameClient::connect(addr, 2);
    a.join_as_host("ABCD");
    join_as_follower(&mut a, &mut b, "ABCD");

    b.place_tower(3, 1, 2).unwrap();
    a.poll_until("HostPlaceTower", is_host_place);
    b.poll_until("PlaceTower", is_place);

    let expected = vec![TowerRecord {
        stats_index: 2,
        x: 3,
        y: 1,
        owner: TowerOwner::Connection(b.id()),
    }];
    assert_eq!(towers(&a), expected);
    assert_eq!(towers(&b), expected);
    assert_eq!(b.sync.inventory().stock(2).used, 1);
    assert_eq!(a.sync.inventory().stock(2).used, 0);

    a.disconnect();
    b.disconnect();
    handle.stop();
}

/// B clicks before its snapshot arrives. The snapshot predates the request,
/// so the confirmation lands after SetState and B's slot must still be held.
#[test]
fn placement_before_snapshot_keeps_reservation() {
    let (handle, addr) = start_test_relay();
    let mut a = TestGameClient::connect(addr, 1);
    let mut b = TestGameClient::connect(addr, 1);
    a.join_as_host("ABCD");

    b.join("ABCD");
    b.place_tower(3, 1, 2).unwrap();
    a.poll_until("HostPlaceTower", is_host_place);
    b.poll_until("SetState", |m| matches!(m, ServerMessage::SetState { .. }));
    b.poll_until("PlaceTower", is_place);

    assert_eq!(towers(&a), towers(&b));
    let owned_by_b = towers(&b)
        .iter()
        .filter(|t| t.owner == TowerOwner::Connection(b.id()))
        .count();
    assert_eq!(owned_by_b, 1);
    assert_eq!(b.sync.inventory().stock(2).used, 1);
    assert_eq!(
        b.place_tower(5, 1, 2),
        Err(PlacementError::OutOfStock { stats_index: 2 })
    );

    a.disconnect();
    b.disconnect();
    handle.stop();
}

/// Two followers race for one cell: the host serializes, one wins, the
/// other is refunded, and no second broadcast is sent.
#[test]
fn contested_cell_is_refused_to_the_loser() {
    let (handle, addr) = start_test_relay();
    let mut a = TestGameClient::connect(addr, 2);
    let mut b = TestGameClient::connect(addr, 2);
    let mut c = TestGameClient::connect(addr, 2);
    a.join_as_host("ABCD");
    join_as_follower(&mut a, &mut b, "ABCD");
    join_as_follower(&mut a, &mut c, "ABCD");

    b.place_tower(5, 5, 1).unwrap();
    c.place_tower(5, 5, 1).unwrap();
    a.poll_until("first HostPlaceTower", is_host_place);
    a.poll_until("second HostPlaceTower", is_host_place);

    let b_seen = b.drain_for(QUIET_WINDOW);
    let c_seen = c.drain_for(QUIET_WINDOW);
    let refunds = |seen: &[ServerMessage]| {
        seen.iter()
            .filter(|m| matches!(m, ServerMessage::RefundPlaceTower { tower_index: 1 }))
            .count()
    };
    let places = |seen: &[ServerMessage]| seen.iter().filter(|m| is_place(m)).count();

    assert_eq!(refunds(&b_seen) + refunds(&c_seen), 1, "exactly one refusal");
    assert_eq!(places(&b_seen), 1, "one broadcast, seen once by B");
    assert_eq!(places(&c_seen), 1, "one broadcast, seen once by C");

    assert_eq!(towers(&a).len(), 1);
    assert_eq!(towers(&a), towers(&b));
    assert_eq!(towers(&a), towers(&c));
    let used = b.sync.inventory().stock(1).used + c.sync.inventory().stock(1).used;
    assert_eq!(used, 1, "loser's reservation was released");

    a.disconnect();
    b.disconnect();
    c.disconnect();
    handle.stop();
}

/// A follower cannot even ask for an occupied cell it does not own.
#[test]
fn occupied_cell_is_refused_locally() {
    let (handle, addr) = start_test_relay();
    let mut a = TestGameClient::connect(addr, 2);
    let mut b = TestGameClient::connect(addr, 2);
    a.join_as_host("ABCD");
    join_as_follower(&mut a, &mut b, "ABCD");

    a.place_tower(2, 2, 0).unwrap();
    b.poll_until("PlaceTower", is_place);

    assert_eq!(
        b.place_tower(2, 2, 1),
        Err(PlacementError::CellOccupied { x: 2, y: 2 })
    );
    assert!(a.drain_for(QUIET_WINDOW).is_empty());

    a.disconnect();
    b.disconnect();
    handle.stop();
}

/// Host disconnect closes the room; the code is free for a new room.
#[test]
fn host_disconnect_closes_room() {
    let (handle, addr) = start_test_relay();
    let mut a = TestGameClient::connect(addr, 2);
    let mut b = TestGameClient::connect(addr, 2);
    let mut c = TestGameClient::connect(addr, 2);
    a.join_as_host("ABCD");
    join_as_follower(&mut a, &mut b, "ABCD");
    join_as_follower(&mut a, &mut c, "ABCD");
    a.place_tower(0, 0, 0).unwrap();
    b.poll_until("PlaceTower", is_place);
    c.poll_until("PlaceTower", is_place);

    a.disconnect();
    for member in [&mut b, &mut c] {
        member.poll_until("RoomClosed", |m| *m == ServerMessage::RoomClosed);
        assert_eq!(member.sync.membership(), Membership::Offline);
        assert!(member.sync.towers().is_empty());
        let extra = member.drain_for(QUIET_WINDOW);
        assert!(
            !extra.contains(&ServerMessage::RoomClosed),
            "RoomClosed delivered twice"
        );
    }

    // Former members are outside the room: a host event goes nowhere.
    b.send_all(vec![ClientMessage::SyncWave {
        wave: 9,
        active: true,
    }]);
    assert!(c.drain_for(QUIET_WINDOW).is_empty());

    // "ABCD" is rejoinable as a fresh room.
    b.join_as_host("ABCD");
    join_as_follower(&mut b, &mut c, "ABCD");
    assert!(c.sync.towers().is_empty());

    b.disconnect();
    c.disconnect();
    handle.stop();
}

/// Follower disconnect: the host evicts its towers and every remaining
/// member converges on the same tower set.
#[test]
fn follower_disconnect_removes_its_towers() {
    let (handle, addr) = start_test_relay();
    let mut a = TestGameClient::connect(addr, 2);
    let mut b = TestGameClient::connect(addr, 2);
    let mut c = TestGameClient::connect(addr, 2);
    a.join_as_host("ABCD");
    join_as_follower(&mut a, &mut b, "ABCD");
    join_as_follower(&mut a, &mut c, "ABCD");

    a.place_tower(0, 0, 0).unwrap();
    b.poll_until("A's PlaceTower", is_place);
    c.poll_until("A's PlaceTower", is_place);
    for (x, y) in [(1, 1), (4, 2)] {
        b.place_tower(x, y, 0).unwrap();
        a.poll_until("HostPlaceTower", is_host_place);
        b.poll_until("PlaceTower", is_place);
        c.poll_until("PlaceTower", is_place);
    }
    assert_eq!(towers(&c).len(), 3);
    let b_id = b.id();

    b.disconnect();
    a.poll_until("RemovePlayerTowers", |m| {
        *m == ServerMessage::RemovePlayerTowers { connection_id: b_id }
    });
    c.poll_until("first RemoveTower", |m| matches!(m, ServerMessage::RemoveTower { .. }));
    c.poll_until("second RemoveTower", |m| matches!(m, ServerMessage::RemoveTower { .. }));

    assert_eq!(towers(&a), towers(&c));
    assert_eq!(towers(&a).len(), 1);
    assert!(a.drain_for(QUIET_WINDOW).is_empty(), "one cleanup only");
    assert_eq!(a.sync.membership(), Membership::Joined { host: true });

    a.disconnect();
    c.disconnect();
    handle.stop();
}

/// A follower's forged simulation events never reach anyone else.
#[test]
fn forged_follower_events_are_dropped() {
    let (handle, addr) = start_test_relay();
    let mut a = TestGameClient::connect(addr, 2);
    let mut b = TestGameClient::connect(addr, 2);
    let mut c = TestGameClient::connect(addr, 2);
    a.join_as_host("ABCD");
    join_as_follower(&mut a, &mut b, "ABCD");
    join_as_follower(&mut a, &mut c, "ABCD");

    b.send_all(vec![
        ClientMessage::SyncSpawnEnemy {
            enemy: EnemyRecord {
                stats_index: 0,
                x: 1.0,
                lane: 0,
                id: EnemyId(666),
                moving: true,
            },
        },
        ClientMessage::SyncWave {
            wave: 50,
            active: true,
        },
        ClientMessage::SyncPlaceTower {
            x: 0,
            y: 0,
            tower_index: 0,
            owner_id: b.id(),
        },
    ]);

    let spawned = a.sync.spawn_enemy(1, 640.0, 2).unwrap();
    a.send_all(spawned.outbound);

    let first = c.poll_until("SpawnEnemy", |m| matches!(m, ServerMessage::SpawnEnemy { .. }));
    assert!(matches!(
        first,
        ServerMessage::SpawnEnemy { enemy } if enemy.id == spawned.id
    ));
    assert!(c.drain_for(QUIET_WINDOW).is_empty());
    assert_eq!(c.sync.enemies().count(), 1);
    assert_eq!(c.sync.wave(), 1);
    assert!(c.sync.towers().is_empty());
    assert!(a.sync.towers().is_empty());

    a.disconnect();
    b.disconnect();
    c.disconnect();
    handle.stop();
}

/// Any member may start; everyone (sender included) starts on the echo,
/// and wave changes from the host reach every follower.
#[test]
fn start_and_waves_reach_everyone() {
    let (handle, addr) = start_test_relay();
    let mut a = TestGameClient::connect(addr, 2);
    let mut b = TestGameClient::connect(addr, 2);
    a.join_as_host("ABCD");
    join_as_follower(&mut a, &mut b, "ABCD");

    b.start();
    assert!(!b.sync.is_started());
    a.poll_until("Start", |m| *m == ServerMessage::Start);
    b.poll_until("Start", |m| *m == ServerMessage::Start);
    assert!(a.sync.is_started());
    assert!(b.sync.is_started());

    let out = a.sync.advance_wave().unwrap();
    a.send_all(out);
    b.poll_until("SetWave", |m| matches!(m, ServerMessage::SetWave { .. }));
    assert_eq!(b.sync.wave(), 2);

    let out = a.sync.end_waves().unwrap();
    a.send_all(out);
    b.poll_until("SetWave", |m| matches!(m, ServerMessage::SetWave { .. }));
    assert!(!b.sync.is_started());
    assert_eq!(b.sync.wave(), 1);

    a.disconnect();
    b.disconnect();
    handle.stop();
}

/// A late joiner mid-game ends up with a mirror identical to the host's.
#[test]
fn late_joiner_matches_host_mid_game() {
    let (handle, addr) = start_test_relay();
    let mut a = TestGameClient::connect(addr, 3);
    let mut b = TestGameClient::connect(addr, 3);
    let mut c = TestGameClient::connect(addr, 3);
    a.join_as_host("ABCD");
    join_as_follower(&mut a, &mut b, "ABCD");

    a.start();
    a.poll_until("Start", |m| *m == ServerMessage::Start);
    b.place_tower(6, 3, 1).unwrap();
    a.poll_until("HostPlaceTower", is_host_place);
    a.place_tower(2, 0, 0).unwrap();
    for (x, lane) in [(700.0, 0), (720.5, 4)] {
        let spawned = a.sync.spawn_enemy(0, x, lane).unwrap();
        a.send_all(spawned.outbound);
    }
    let shot = a.sync.spawn_projectile(1, 200.0, 96.0).unwrap();
    a.send_all(shot.outbound);
    let out = a.sync.advance_wave().unwrap();
    a.send_all(out);

    join_as_follower(&mut a, &mut c, "ABCD");
    assert_eq!(c.sync.snapshot(), a.sync.snapshot());
    assert!(c.sync.is_started());
    assert_eq!(c.sync.wave(), 2);

    // B, who watched it all live, agrees too.
    b.drain_for(QUIET_WINDOW);
    assert_eq!(b.sync.snapshot(), a.sync.snapshot());

    a.disconnect();
    b.disconnect();
    c.disconnect();
    handle.stop();
}

/// Leaving a room explicitly behaves like a follower disconnect for the
/// room, while the connection stays usable.
#[test]
fn explicit_leave_keeps_connection() {
    let (handle, addr) = start_test_relay();
    let mut a = TestGameClient::connect(addr, 2);
    let mut b = TestGameClient::connect(addr, 2);
    a.join_as_host("ABCD");
    join_as_follower(&mut a, &mut b, "ABCD");

    b.leave();
    assert_eq!(b.sync.membership(), Membership::Offline);
    a.poll_until("RemovePlayerTowers", |m| {
        matches!(m, ServerMessage::RemovePlayerTowers { .. })
    });

    b.join_as_host("WXYZ");
    assert!(b.sync.is_host());

    a.disconnect();
    b.disconnect();
    handle.stop();
}
