// bulwark_sync: client-side state synchronization for Bulwark multiplayer.
//
// The relay forwards events without understanding them; this crate is the
// other half. It keeps a participant's copy of the tower grid, enemies,
// projectiles, wave counter, and tower inventory, applies relay messages to
// it, and produces the events a host or follower must send back. It does no
// I/O of its own, so the same adapter runs behind a `NetClient`, in tests,
// or offline.
//
// Module overview:
// - `adapter.rs`:   `SyncAdapter`, the state mirror and its host/follower
//                   rules, plus `Membership` and `Spawned`.
// - `tower_map.rs`: `TowerMap`, the fixed grid of `TowerRecord`s.
// - `inventory.rs`: owned/reserved tower counts per stats index.
// - `config.rs`:    `SyncConfig` (grid size, starting wave).
// - `error.rs`:     `PlacementError`, `NotInControl`.
//
// Game content (enemy stats, tower stats, rendering, the spawner's timing)
// stays in the game; records here carry only the indices and positions
// needed to rebuild them.

pub mod adapter;
pub mod config;
pub mod error;
pub mod inventory;
pub mod tower_map;

pub use adapter::{Membership, Spawned, SyncAdapter};
pub use config::SyncConfig;
pub use error::{NotInControl, PlacementError};
pub use inventory::{Inventory, Stock};
pub use tower_map::TowerMap;
