// bulwark_relay: room relay for Bulwark multiplayer sessions.
//
// The relay is a thin broker. It groups connections into rooms by a short
// code, makes the first member of each room its host, brokers the state
// snapshot a joining follower needs, and forwards gameplay events according
// to who is allowed to send them. It never runs the game: towers, enemies,
// and waves exist only on clients, and the host's copy is authoritative.
//
// Module overview:
// - `registry.rs`:    connection → room and room → host bookkeeping.
// - `election.rs`:    who to notify when a room gains or loses a member.
// - `snapshot.rs`:    outstanding `GetState` requests awaiting the host.
// - `router.rs`:      per-event authority checks and delivery fan-out.
// - `connections.rs`: write halves of live sockets, `ConnectionId` issue.
// - `server.rs`:      TCP listener, reader threads, and the main event loop.
//                     `std::net` with a thread-per-reader architecture and
//                     an `mpsc` channel into the single-threaded `Router`.
// - `client.rs`:      `NetClient`, the game-side TCP client.
// - `error.rs`:       `RelayError` and `ClientError`.
//
// Dependencies: `bulwark_protocol` for messages and framing, `tracing` for
// logs, `thiserror` for error types. The binary adds `clap`,
// `tracing-subscriber`, and `anyhow`.
//
// The relay can run as a standalone binary (`main.rs`) or be embedded in a
// game process or test via the library API (`start_relay`).

pub mod client;
pub mod connections;
pub mod election;
pub mod error;
pub mod registry;
pub mod router;
pub mod server;
pub mod snapshot;

pub use client::{NetClient, WelcomeInfo};
pub use error::{ClientError, RelayError};
pub use server::{RelayConfig, RelayHandle, start_relay};
