// Client-side mirror of the game state, and the rules for keeping it in
// step with the rest of the room.
//
// `SyncAdapter` holds everything the relay forwards but never interprets:
// the tower grid, live enemies and projectiles, the wave counter, and the
// local tower inventory. It is transport-agnostic. The caller feeds it each
// `ServerMessage` via `apply()` and sends back whatever `ClientMessage`s it
// returns; local player clicks and host simulation steps go through the
// `try_*` actions and host hooks, which return events the same way.
//
// Control: a participant is *in control* when it is offline or the room's
// host. In control, actions mutate the local model directly and emit the
// matching `Sync*` broadcast (only while in a room). A follower instead
// sends a request and waits for the host's broadcast, keeping an inventory
// reservation until the host confirms or refunds it.
//
// Inventory accounting: a reservation is held for every tower on the grid
// that belongs to this participant, plus one per placement request still in
// flight. Requests in flight are counted per stats index so a snapshot
// arriving between a click and its confirmation keeps their slots. Every
// removal path releases the slot if the removed tower was ours, so a
// host-side eviction refunds the follower without a dedicated message.

use std::collections::BTreeMap;

use bulwark_protocol::{
    ClientMessage, ConnectionId, EnemyId, EnemyRecord, HostState, ProjectileId, ProjectileRecord,
    ServerMessage, TowerOwner, TowerRecord,
};
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::{NotInControl, PlacementError};
use crate::inventory::Inventory;
use crate::tower_map::TowerMap;

/// Whether this participant is in a room, and in which role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Membership {
    Offline,
    Joined { host: bool },
}

/// Result of a host spawn hook: the new object's ID plus the events to send.
#[derive(Clone, Debug, PartialEq)]
pub struct Spawned<Id> {
    pub id: Id,
    pub outbound: Vec<ClientMessage>,
}

pub struct SyncAdapter {
    config: SyncConfig,
    towers: TowerMap,
    enemies: BTreeMap<EnemyId, EnemyRecord>,
    projectiles: BTreeMap<ProjectileId, ProjectileRecord>,
    wave: u32,
    started: bool,
    inventory: Inventory,
    /// Placement requests sent but not yet confirmed or refunded, by kind.
    pending_placements: BTreeMap<u32, u32>,
    membership: Membership,
    local_id: Option<ConnectionId>,
    next_enemy_id: u32,
    next_projectile_id: u32,
}

impl SyncAdapter {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            towers: TowerMap::new(config.width, config.height),
            enemies: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            wave: config.starting_wave,
            started: false,
            inventory: Inventory::new(),
            pending_placements: BTreeMap::new(),
            membership: Membership::Offline,
            local_id: None,
            next_enemy_id: 0,
            next_projectile_id: 0,
            config,
        }
    }

    // -- Queries ------------------------------------------------------------

    pub fn towers(&self) -> &TowerMap {
        &self.towers
    }

    pub fn enemy(&self, id: EnemyId) -> Option<&EnemyRecord> {
        self.enemies.get(&id)
    }

    pub fn enemies(&self) -> impl Iterator<Item = &EnemyRecord> {
        self.enemies.values()
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &ProjectileRecord> {
        self.projectiles.values()
    }

    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    pub fn membership(&self) -> Membership {
        self.membership
    }

    pub fn local_id(&self) -> Option<ConnectionId> {
        self.local_id
    }

    pub fn is_joined(&self) -> bool {
        matches!(self.membership, Membership::Joined { .. })
    }

    pub fn is_host(&self) -> bool {
        self.membership == Membership::Joined { host: true }
    }

    /// Offline play or room host: local actions take effect immediately.
    pub fn is_in_control(&self) -> bool {
        matches!(
            self.membership,
            Membership::Offline | Membership::Joined { host: true }
        )
    }

    /// The authoritative view handed to a joining follower.
    pub fn snapshot(&self) -> HostState {
        HostState {
            is_started: self.started,
            wave: self.wave,
            enemy_spawns: self.enemies.values().cloned().collect(),
            projectile_spawns: self.projectiles.values().cloned().collect(),
            tower_spawns: self.towers.towers().copied().collect(),
        }
    }

    // -- Membership ---------------------------------------------------------

    /// Enter a room. The local game is reset; the relay's answer
    /// (`PromoteToHost` or `GetState`/`SetState`) decides the role.
    pub fn join_room(&mut self, room_code: &str) -> Vec<ClientMessage> {
        if self.is_joined() {
            debug!(room_code, "already in a room, join ignored");
            return Vec::new();
        }
        self.reset();
        self.membership = Membership::Joined { host: false };
        vec![ClientMessage::JoinRoom {
            room_code: room_code.into(),
        }]
    }

    pub fn leave_room(&mut self) -> Vec<ClientMessage> {
        if !self.is_joined() {
            return Vec::new();
        }
        self.go_offline();
        vec![ClientMessage::LeaveRoom]
    }

    fn go_offline(&mut self) {
        if self.is_joined() {
            self.membership = Membership::Offline;
            self.reset();
        }
    }

    /// Clear the simulation model and every inventory reservation.
    pub fn reset(&mut self) {
        self.pending_placements.clear();
        self.clear_model();
    }

    fn clear_model(&mut self) {
        self.towers.clear();
        self.enemies.clear();
        self.projectiles.clear();
        self.wave = self.config.starting_wave;
        self.started = false;
        self.inventory.release_all();
    }

    // -- Inbound ------------------------------------------------------------

    /// Apply one relay message; returns the events to send in response.
    pub fn apply(&mut self, message: ServerMessage) -> Vec<ClientMessage> {
        match message {
            ServerMessage::Welcome { connection_id } => {
                self.local_id = Some(connection_id);
                Vec::new()
            }
            ServerMessage::Rejected { reason } => {
                info!(%reason, "relay refused the connection");
                self.local_id = None;
                self.go_offline();
                Vec::new()
            }
            ServerMessage::JoinRejected { reason } => {
                info!(%reason, "room join refused");
                self.go_offline();
                Vec::new()
            }
            ServerMessage::PromoteToHost => {
                if self.is_joined() {
                    self.membership = Membership::Joined { host: true };
                }
                Vec::new()
            }
            ServerMessage::RoomClosed => {
                info!("room closed by host");
                self.go_offline();
                Vec::new()
            }
            ServerMessage::GetState { for_id } => {
                if !self.is_host() {
                    debug!(%for_id, "state request while not host, ignored");
                    return Vec::new();
                }
                vec![ClientMessage::ReturnState {
                    for_id,
                    state: self.snapshot(),
                }]
            }
            ServerMessage::SetState { state } => {
                self.load_snapshot(state);
                Vec::new()
            }
            ServerMessage::Start => {
                self.started = true;
                Vec::new()
            }
            ServerMessage::HostPlaceTower {
                x,
                y,
                tower_index,
                requester,
            } => self.host_place_tower(x, y, tower_index, requester),
            ServerMessage::PlaceTower {
                x,
                y,
                tower_index,
                owner_id,
            } => {
                let tower = TowerRecord {
                    stats_index: tower_index,
                    x,
                    y,
                    owner: TowerOwner::Connection(owner_id),
                };
                if tower.owner.is_local_to(self.local_id) && !self.settle_request(tower_index) {
                    self.inventory.start_using(tower_index, 1);
                }
                self.put_tower(tower);
                Vec::new()
            }
            ServerMessage::RefundPlaceTower { tower_index } => {
                if self.settle_request(tower_index) {
                    self.inventory.stop_using(tower_index, 1);
                } else {
                    debug!(tower_index, "refund without a pending request, ignored");
                }
                Vec::new()
            }
            ServerMessage::HostRemoveTower { x, y, requester } => {
                self.host_remove_tower(x, y, requester)
            }
            ServerMessage::RemoveTower { x, y } => {
                self.take_tower(x, y);
                Vec::new()
            }
            ServerMessage::SpawnEnemy { enemy } => {
                self.enemies.insert(enemy.id, enemy);
                Vec::new()
            }
            ServerMessage::RemoveEnemy { id } => {
                self.enemies.remove(&id);
                Vec::new()
            }
            ServerMessage::SpawnProjectile { projectile } => {
                self.projectiles.insert(projectile.id, projectile);
                Vec::new()
            }
            ServerMessage::RemoveProjectile { id } => {
                self.projectiles.remove(&id);
                Vec::new()
            }
            ServerMessage::SetEnemyMoving { id, moving } => {
                if let Some(enemy) = self.enemies.get_mut(&id) {
                    enemy.moving = moving;
                }
                Vec::new()
            }
            ServerMessage::SetWave { wave, active } => {
                self.started = active;
                self.wave = wave;
                Vec::new()
            }
            ServerMessage::RemovePlayerTowers { connection_id } => {
                self.evict_player_towers(connection_id)
            }
        }
    }

    /// Replace the model with the host's view. Reservations for requests
    /// still in flight survive; the snapshot predates them.
    fn load_snapshot(&mut self, state: HostState) {
        self.clear_model();
        for (&stats_index, &count) in &self.pending_placements {
            self.inventory.start_using(stats_index, count);
        }
        if state.is_started {
            self.started = true;
            self.wave = state.wave;
        }
        for enemy in state.enemy_spawns {
            self.enemies.insert(enemy.id, enemy);
        }
        for projectile in state.projectile_spawns {
            self.projectiles.insert(projectile.id, projectile);
        }
        for tower in state.tower_spawns {
            if !self.towers.contains(tower.x, tower.y) {
                debug!(x = tower.x, y = tower.y, "snapshot tower outside grid, skipped");
                continue;
            }
            if tower.owner.is_local_to(self.local_id) {
                self.inventory.start_using(tower.stats_index, 1);
            }
            self.towers.place(tower);
        }
    }

    fn host_place_tower(
        &mut self,
        x: u32,
        y: u32,
        tower_index: u32,
        requester: ConnectionId,
    ) -> Vec<ClientMessage> {
        if !self.is_host() {
            debug!(%requester, "placement request while not host, ignored");
            return Vec::new();
        }
        if !self.towers.contains(x, y) || self.towers.is_occupied(x, y) {
            debug!(%requester, x, y, "placement refused");
            return vec![ClientMessage::FailedPlaceTower {
                tower_index,
                for_id: requester,
            }];
        }
        self.towers.place(TowerRecord {
            stats_index: tower_index,
            x,
            y,
            owner: TowerOwner::Connection(requester),
        });
        vec![ClientMessage::SyncPlaceTower {
            x,
            y,
            tower_index,
            owner_id: requester,
        }]
    }

    fn host_remove_tower(&mut self, x: u32, y: u32, requester: ConnectionId) -> Vec<ClientMessage> {
        if !self.is_host() {
            debug!(%requester, "removal request while not host, ignored");
            return Vec::new();
        }
        let Some(owner) = self.towers.get(x, y).map(|t| t.owner) else {
            return Vec::new();
        };
        if !owner.permits(requester, self.local_id) {
            debug!(%requester, x, y, "removal refused: not the owner");
            return Vec::new();
        }
        self.take_tower(x, y);
        vec![ClientMessage::SyncRemoveTower { x, y }]
    }

    fn evict_player_towers(&mut self, connection: ConnectionId) -> Vec<ClientMessage> {
        if !self.is_host() {
            return Vec::new();
        }
        let cells = self
            .towers
            .cells_owned_by(TowerOwner::Connection(connection));
        info!(%connection, towers = cells.len(), "removing departed player's towers");
        cells
            .into_iter()
            .map(|(x, y)| {
                self.take_tower(x, y);
                ClientMessage::SyncRemoveTower { x, y }
            })
            .collect()
    }

    /// Place a tower, releasing the slot of a local tower it displaces.
    fn put_tower(&mut self, tower: TowerRecord) {
        if let Some(previous) = self.towers.place(tower) {
            self.release_if_local(&previous);
        }
    }

    /// Remove a tower, releasing its slot if it was ours.
    fn take_tower(&mut self, x: u32, y: u32) -> Option<TowerRecord> {
        let removed = self.towers.remove(x, y)?;
        self.release_if_local(&removed);
        Some(removed)
    }

    /// Forget one in-flight request of `stats_index`. False if none was
    /// outstanding.
    fn settle_request(&mut self, stats_index: u32) -> bool {
        let Some(count) = self.pending_placements.get_mut(&stats_index) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.pending_placements.remove(&stats_index);
        }
        true
    }

    fn release_if_local(&mut self, tower: &TowerRecord) {
        if tower.owner.is_local_to(self.local_id) {
            self.inventory.stop_using(tower.stats_index, 1);
        }
    }

    // -- Local player actions -----------------------------------------------

    /// A click on `(x, y)` with tower kind `stats_index` selected. An
    /// occupied cell holding one of our own towers toggles it off instead.
    pub fn try_place_tower(
        &mut self,
        x: u32,
        y: u32,
        stats_index: u32,
    ) -> Result<Vec<ClientMessage>, PlacementError> {
        if !self.towers.contains(x, y) {
            return Err(PlacementError::OutOfBounds { x, y });
        }
        if let Some(owner) = self.towers.get(x, y).map(|t| t.owner) {
            if owner.is_local_to(self.local_id) {
                return self.try_remove_tower(x, y);
            }
            return Err(PlacementError::CellOccupied { x, y });
        }
        if !self.inventory.start_using(stats_index, 1) {
            return Err(PlacementError::OutOfStock { stats_index });
        }

        if !self.is_in_control() {
            *self.pending_placements.entry(stats_index).or_insert(0) += 1;
            return Ok(vec![ClientMessage::RequestPlaceTower {
                x,
                y,
                tower_index: stats_index,
            }]);
        }

        let owner = self.local_owner();
        self.towers.place(TowerRecord {
            stats_index,
            x,
            y,
            owner,
        });
        Ok(match owner {
            TowerOwner::Connection(owner_id) => vec![ClientMessage::SyncPlaceTower {
                x,
                y,
                tower_index: stats_index,
                owner_id,
            }],
            TowerOwner::Local => Vec::new(),
        })
    }

    /// Remove one of our own towers (directly, or by request as follower).
    pub fn try_remove_tower(
        &mut self,
        x: u32,
        y: u32,
    ) -> Result<Vec<ClientMessage>, PlacementError> {
        if !self.towers.contains(x, y) {
            return Err(PlacementError::OutOfBounds { x, y });
        }
        let Some(owner) = self.towers.get(x, y).map(|t| t.owner) else {
            return Err(PlacementError::EmptyCell { x, y });
        };
        if !owner.is_local_to(self.local_id) {
            return Err(PlacementError::NotOwner { x, y });
        }

        if !self.is_in_control() {
            return Ok(vec![ClientMessage::RequestRemoveTower { x, y }]);
        }
        self.take_tower(x, y);
        Ok(self.outbound(ClientMessage::SyncRemoveTower { x, y }))
    }

    /// Ask for the waves to begin. Offline this starts immediately; in a
    /// room any member may ask and everyone (including us) starts on the
    /// relay's echo.
    pub fn start(&mut self) -> Vec<ClientMessage> {
        if self.is_joined() {
            return vec![ClientMessage::Start];
        }
        self.started = true;
        Vec::new()
    }

    // -- Host simulation hooks ----------------------------------------------

    pub fn spawn_enemy(
        &mut self,
        stats_index: u32,
        x: f32,
        lane: u32,
    ) -> Result<Spawned<EnemyId>, NotInControl> {
        self.require_control()?;
        let id = EnemyId(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.wrapping_add(1);
        let enemy = EnemyRecord {
            stats_index,
            x,
            lane,
            id,
            moving: true,
        };
        self.enemies.insert(id, enemy.clone());
        Ok(Spawned {
            id,
            outbound: self.outbound(ClientMessage::SyncSpawnEnemy { enemy }),
        })
    }

    pub fn remove_enemy(&mut self, id: EnemyId) -> Result<Vec<ClientMessage>, NotInControl> {
        self.require_control()?;
        if self.enemies.remove(&id).is_none() {
            return Ok(Vec::new());
        }
        Ok(self.outbound(ClientMessage::SyncRemoveEnemy { id }))
    }

    pub fn set_enemy_moving(
        &mut self,
        id: EnemyId,
        moving: bool,
    ) -> Result<Vec<ClientMessage>, NotInControl> {
        self.require_control()?;
        let Some(enemy) = self.enemies.get_mut(&id) else {
            return Ok(Vec::new());
        };
        enemy.moving = moving;
        Ok(self.outbound(ClientMessage::SyncEnemyMoving { id, moving }))
    }

    pub fn spawn_projectile(
        &mut self,
        tower_stats_index: u32,
        x: f32,
        y: f32,
    ) -> Result<Spawned<ProjectileId>, NotInControl> {
        self.require_control()?;
        let id = ProjectileId(self.next_projectile_id);
        self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
        let projectile = ProjectileRecord {
            tower_stats_index,
            x,
            y,
            id,
        };
        self.projectiles.insert(id, projectile.clone());
        Ok(Spawned {
            id,
            outbound: self.outbound(ClientMessage::SyncSpawnProjectile { projectile }),
        })
    }

    pub fn remove_projectile(
        &mut self,
        id: ProjectileId,
    ) -> Result<Vec<ClientMessage>, NotInControl> {
        self.require_control()?;
        if self.projectiles.remove(&id).is_none() {
            return Ok(Vec::new());
        }
        Ok(self.outbound(ClientMessage::SyncRemoveProjectile { id }))
    }

    /// Move to the next wave, keeping the spawner's running state.
    pub fn advance_wave(&mut self) -> Result<Vec<ClientMessage>, NotInControl> {
        self.require_control()?;
        self.wave = self.wave.saturating_add(1);
        Ok(self.outbound(ClientMessage::SyncWave {
            wave: self.wave,
            active: self.started,
        }))
    }

    /// Stop spawning and rewind to the starting wave (game over).
    pub fn end_waves(&mut self) -> Result<Vec<ClientMessage>, NotInControl> {
        self.require_control()?;
        self.started = false;
        self.wave = self.config.starting_wave;
        Ok(self.outbound(ClientMessage::SyncWave {
            wave: self.wave,
            active: false,
        }))
    }

    fn require_control(&self) -> Result<(), NotInControl> {
        if self.is_in_control() {
            Ok(())
        } else {
            Err(NotInControl)
        }
    }

    /// Owner tag for a tower we place ourselves.
    fn local_owner(&self) -> TowerOwner {
        match (self.membership, self.local_id) {
            (Membership::Joined { .. }, Some(id)) => TowerOwner::Connection(id),
            _ => TowerOwner::Local,
        }
    }

    /// `message` if we are in a room, nothing otherwise.
    fn outbound(&self, message: ClientMessage) -> Vec<ClientMessage> {
        if self.is_joined() {
            vec![message]
        } else {
            Vec::new()
        }
    }
}
