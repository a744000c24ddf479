// CLI entry point for the Bulwark relay.
//
// Starts a standalone relay that game clients connect to. The relay groups
// clients into rooms and forwards events; it never runs the game. See
// `server.rs` for the networking architecture and `router.rs` for the
// forwarding rules.
//
// Every option can also be set from the environment (`BULWARK_*`). Log
// verbosity follows `RUST_LOG` and defaults to `DEFAULT_LOG_FILTER`.
//
// The relay runs until the process is killed; SIGINT/SIGTERM tear the
// threads down with the process.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bulwark_relay::server::{RelayConfig, start_relay};

/// Bulwark multiplayer relay
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(about = "Room relay for Bulwark multiplayer sessions")]
struct Args {
    /// Address to bind to
    #[arg(long, env = "BULWARK_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(short, long, env = "BULWARK_PORT", default_value_t = 7878)]
    port: u16,

    /// Maximum simultaneous connections
    #[arg(long, env = "BULWARK_MAX_CONNECTIONS", default_value_t = 64)]
    max_connections: usize,

    /// Maximum members per room, host included
    #[arg(long, env = "BULWARK_MAX_ROOM_MEMBERS", default_value_t = 8)]
    max_room_members: usize,

    /// Maximum room code length
    #[arg(long, env = "BULWARK_MAX_ROOM_CODE_LEN", default_value_t = 6)]
    max_room_code_len: usize,
}

impl From<Args> for RelayConfig {
    fn from(args: Args) -> Self {
        Self {
            bind_addr: args.bind,
            port: args.port,
            max_connections: args.max_connections,
            max_room_members: args.max_room_members,
            max_room_code_len: args.max_room_code_len,
        }
    }
}

/// Used when `RUST_LOG` is unset. The binary's own target is `relay`.
const DEFAULT_LOG_FILTER: &str = "bulwark_relay=info,relay=info";

fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = RelayConfig::from(args);
    tracing::info!(?config, "starting relay");

    let (handle, addr) = start_relay(config).context("failed to start relay")?;
    println!("Relay listening on {addr}");
    println!("Press Ctrl+C to stop.");

    handle.wait();
    Ok(())
}
