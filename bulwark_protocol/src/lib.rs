// bulwark_protocol: wire protocol for the Bulwark multiplayer relay.
//
// This crate defines everything the relay (`bulwark_relay`) and game clients
// (`bulwark_sync`) must agree on: connection and object IDs, the record
// shapes carried by spawn events and snapshots, the two message enums, the
// length-delimited framing, and room-code validation. It has no dependency
// on either side.
//
// Module overview:
// - `types.rs`:     `ConnectionId`, `EnemyId`, `ProjectileId`.
// - `records.rs`:   `EnemyRecord`, `ProjectileRecord`, `TowerRecord`,
//                   `HostState`, and the `TowerOwner` ownership predicate.
// - `message.rs`:   `ClientMessage` (connection → relay) and `ServerMessage`
//                   (relay → connection).
// - `framing.rs`:   4-byte big-endian length prefix + JSON payload over any
//                   `Read`/`Write`.
// - `room_code.rs`: `RoomCode` parsing and `RoomCodeError`.
//
// Design decisions:
// - **JSON serialization.** Snapshots are small (one tower grid plus a few
//   dozen enemies) and JSON keeps captured traffic readable.
// - **Records are opaque to the relay.** The relay forwards them without
//   interpretation; only `bulwark_sync` gives them meaning.
// - **No async runtime.** Framing works on `std::io::Read`/`Write`, which
//   both the relay's blocking reader threads and the client use.

pub mod framing;
pub mod message;
pub mod records;
pub mod room_code;
pub mod types;

pub use framing::{MAX_MESSAGE_SIZE, read_json, read_message, write_json, write_message};
pub use message::{ClientMessage, ServerMessage};
pub use records::{EnemyRecord, HostState, ProjectileRecord, TowerOwner, TowerRecord};
pub use room_code::{DEFAULT_MAX_ROOM_CODE_LEN, RoomCode, RoomCodeError};
pub use types::{ConnectionId, EnemyId, ProjectileId};
