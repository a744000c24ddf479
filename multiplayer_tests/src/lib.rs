// Test-only game client for multiplayer integration tests.
//
// Wraps the real `NetClient` (from `bulwark_relay::client`) and a real
// `SyncAdapter` (from `bulwark_sync`) to provide a synchronous,
// test-friendly API for exercising the full pipeline:
// local action → relay → host decision → relay → every mirror.
//
// Every relay message is applied to the adapter and the adapter's replies
// are sent immediately, exactly as a game loop would. The only
// test-specific code here is the blocking polling wrappers. Messages are
// applied one at a time so `poll_until` can stop right after the one a
// test is waiting for; anything polled beyond it stays queued for the next
// call.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use bulwark_protocol::{ClientMessage, ConnectionId, ServerMessage};
use bulwark_relay::client::NetClient;
use bulwark_sync::{PlacementError, SyncAdapter, SyncConfig};

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A test game client wrapping a real NetClient and SyncAdapter.
pub struct TestGameClient {
    client: NetClient,
    pub sync: SyncAdapter,
    queued: VecDeque<ServerMessage>,
}

impl TestGameClient {
    /// Connect to a relay and apply its `Welcome`. The inventory starts with
    /// `stock` of every tower kind in `0..4`.
    pub fn connect(addr: SocketAddr, stock: u32) -> Self {
        let (client, info) = NetClient::connect(addr).expect("TestGameClient::connect failed");
        let mut sync = SyncAdapter::new(SyncConfig::default());
        sync.apply(ServerMessage::Welcome {
            connection_id: info.connection_id,
        });
        for kind in 0..4 {
            sync.inventory_mut().add(kind, stock);
        }
        Self {
            client,
            sync,
            queued: VecDeque::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.client.connection_id()
    }

    /// Send events without touching the local mirror. Used both for the
    /// adapter's own output and for forging events in tests.
    pub fn send_all(&mut self, messages: Vec<ClientMessage>) {
        for msg in &messages {
            self.client.send(msg).expect("send failed");
        }
    }

    pub fn join(&mut self, room: &str) {
        let out = self.sync.join_room(room);
        self.send_all(out);
    }

    /// Join and wait for the relay to make us host.
    pub fn join_as_host(&mut self, room: &str) {
        self.join(room);
        self.poll_until("PromoteToHost", |m| matches!(m, ServerMessage::PromoteToHost));
    }

    pub fn leave(&mut self) {
        let out = self.sync.leave_room();
        self.send_all(out);
    }

    pub fn place_tower(&mut self, x: u32, y: u32, kind: u32) -> Result<(), PlacementError> {
        let out = self.sync.try_place_tower(x, y, kind)?;
        self.send_all(out);
        Ok(())
    }

    pub fn remove_tower(&mut self, x: u32, y: u32) -> Result<(), PlacementError> {
        let out = self.sync.try_remove_tower(x, y)?;
        self.send_all(out);
        Ok(())
    }

    pub fn start(&mut self) {
        let out = self.sync.start();
        self.send_all(out);
    }

    /// Apply one message and send the adapter's replies.
    fn apply(&mut self, msg: ServerMessage) {
        let out = self.sync.apply(msg);
        self.send_all(out);
    }

    fn next_message(&mut self) -> Option<ServerMessage> {
        if self.queued.is_empty() {
            self.queued.extend(self.client.poll());
        }
        self.queued.pop_front()
    }

    /// Blocking poll, applying messages in order, until one matches `pred`.
    /// Returns that message; later messages stay queued.
    pub fn poll_until(
        &mut self,
        what: &str,
        pred: impl Fn(&ServerMessage) -> bool,
    ) -> ServerMessage {
        let start = Instant::now();
        loop {
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for {what}"
            );
            match self.next_message() {
                Some(msg) => {
                    let matched = pred(&msg);
                    self.apply(msg.clone());
                    if matched {
                        return msg;
                    }
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        }
    }

    /// Apply everything that arrives within `window` and return it. Used
    /// to show that nothing (else) was delivered.
    pub fn drain_for(&mut self, window: Duration) -> Vec<ServerMessage> {
        let start = Instant::now();
        let mut seen = Vec::new();
        while start.elapsed() < window {
            match self.next_message() {
                Some(msg) => {
                    self.apply(msg.clone());
                    seen.push(msg);
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        }
        seen
    }

    /// Send Goodbye and close the connection.
    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }
}
