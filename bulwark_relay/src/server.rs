// TCP server and main event loop for the relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (non-blocking `accept()` loop): accepts TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per connection): call `read_json()` in a loop
//   and send `InternalEvent::MessageFrom`. `Goodbye`, EOF, and malformed
//   frames all end the loop with a single `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Router` and the `ConnectionTable`, and
//   handles one event at a time. Every registry mutation plus the writes it
//   causes complete before the next event is looked at, so two joins to the
//   same fresh room can never both become host.
//
// The main thread is the only writer to client sockets. Per-connection
// order is preserved because each reader thread feeds one channel in
// arrival order and the main thread writes deliveries in router order.
//
// Shutdown: `RelayHandle::stop` clears `keep_running`. The main thread
// notices within one `recv_timeout` tick, shuts down every socket (which
// unblocks the reader threads), and exits.

use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use bulwark_protocol::{ClientMessage, ConnectionId, DEFAULT_MAX_ROOM_CODE_LEN, ServerMessage};
use bulwark_protocol::{read_json, write_json};
use tracing::{debug, info, warn};

use crate::connections::ConnectionTable;
use crate::error::RelayError;
use crate::router::Router;

/// How long the main loop blocks before rechecking `keep_running`.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long the listener sleeps when no connection is waiting.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
        peer: SocketAddr,
    },
    MessageFrom {
        connection: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        connection: ConnectionId,
    },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.join();
    }

    /// Block until the relay exits on its own (it only does so if every
    /// event sender is gone, which in practice means never).
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(Err(_)) = self.thread.take().map(thread::JoinHandle::join) {
            warn!("relay thread panicked");
        }
    }
}

/// Configuration for starting a relay server.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Live connections beyond this are sent `Rejected` and closed.
    pub max_connections: usize,
    /// Joins to a room at this size are answered with `JoinRejected`.
    pub max_room_members: usize,
    pub max_room_code_len: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 7878,
            max_connections: 64,
            max_room_members: 8,
            max_room_code_len: DEFAULT_MAX_ROOM_CODE_LEN,
        }
    }
}

/// Start the relay server on a background thread. Returns a handle for
/// stopping it and the actual bound address (useful when port 0 is used
/// to let the OS pick a free port).
pub fn start_relay(config: RelayConfig) -> Result<(RelayHandle, SocketAddr), RelayError> {
    let listener =
        TcpListener::bind((config.bind_addr.as_str(), config.port)).map_err(|source| {
            RelayError::Bind {
                addr: format!("{}:{}", config.bind_addr, config.port),
                source,
            }
        })?;
    let addr = listener.local_addr()?;
    // Non-blocking so the accept thread can check keep_running periodically.
    listener.set_nonblocking(true)?;

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_main = keep_running.clone();
    let thread = thread::Builder::new()
        .name("bulwark-relay".into())
        .spawn(move || run_relay(listener, config, keep_running_main))
        .map_err(RelayError::Thread)?;

    info!(%addr, "relay listening");
    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main relay loop. Runs until `keep_running` is set to false.
fn run_relay(listener: TcpListener, config: RelayConfig, keep_running: Arc<AtomicBool>) {
    let mut router = Router::new(config.max_room_members, config.max_room_code_len);
    let mut connections = ConnectionTable::new();

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || accept_loop(listener, tx_listener, keep_running_listener));

    let mut ctx = EventContext {
        router: &mut router,
        connections: &mut connections,
        tx: &tx,
        keep_running: &keep_running,
        max_connections: config.max_connections,
    };

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(event) => {
                ctx.handle_event(event);
                // Drain any additional events that arrived during handling.
                while let Ok(event) = rx.try_recv() {
                    ctx.handle_event(event);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    connections.close_all();
    info!("relay stopped");
}

/// Listener thread: hand accepted sockets to the main thread.
fn accept_loop(listener: TcpListener, tx: Sender<InternalEvent>, keep_running: Arc<AtomicBool>) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    debug!(%peer, error = %e, "could not make socket blocking");
                    continue;
                }
                if tx.send(InternalEvent::NewConnection { stream, peer }).is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) => {
                warn!(error = %e, "accept failed, listener exiting");
                break;
            }
        }
    }
}

/// Borrowed main-thread state threaded through event dispatch.
struct EventContext<'a> {
    router: &'a mut Router,
    connections: &'a mut ConnectionTable,
    tx: &'a Sender<InternalEvent>,
    keep_running: &'a Arc<AtomicBool>,
    max_connections: usize,
}

impl EventContext<'_> {
    fn handle_event(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::NewConnection { stream, peer } => self.accept(stream, peer),
            InternalEvent::MessageFrom {
                connection,
                message,
            } => {
                if !self.connections.contains(connection) {
                    return;
                }
                debug!(%connection, event = message.name(), "received");
                let deliveries = self.router.handle(connection, message);
                self.connections.deliver(deliveries);
            }
            InternalEvent::Disconnected { connection } => {
                if !self.connections.contains(connection) {
                    return;
                }
                let deliveries = self.router.disconnect(connection);
                self.connections.deliver(deliveries);
                self.connections.remove(connection);
                info!(%connection, live = self.connections.len(), "disconnected");
            }
        }
    }

    /// Register a new connection, greet it, and spawn its reader thread.
    fn accept(&mut self, stream: TcpStream, peer: SocketAddr) {
        if self.connections.len() >= self.max_connections {
            warn!(%peer, max = self.max_connections, "relay full, refusing connection");
            let rejected = ServerMessage::Rejected {
                reason: "relay is full".into(),
            };
            let mut writer = std::io::BufWriter::new(stream);
            let _ = write_json(&mut writer, &rejected);
            return;
        }

        let read_half = match stream.try_clone() {
            Ok(s) => s,
            Err(e) => {
                warn!(%peer, error = %e, "could not clone socket");
                return;
            }
        };

        let connection = self.connections.add(stream);
        info!(%connection, %peer, live = self.connections.len(), "connected");
        let welcome = self.router.connect(connection);
        self.connections.deliver(welcome);

        let tx = self.tx.clone();
        let keep_running = self.keep_running.clone();
        let spawned = thread::Builder::new()
            .name(format!("bulwark-reader-{connection}"))
            .spawn(move || reader_loop(BufReader::new(read_half), connection, tx, keep_running));
        if let Err(e) = spawned {
            warn!(%connection, error = %e, "could not spawn reader thread");
            self.connections.remove(connection);
        }
    }
}

/// Reader loop for a single connection. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    connection: ConnectionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_json::<_, ClientMessage>(&mut reader) {
            Ok(ClientMessage::Goodbye) => {
                debug!(%connection, "goodbye");
                break;
            }
            Ok(message) => {
                if tx
                    .send(InternalEvent::MessageFrom {
                        connection,
                        message,
                    })
                    .is_err()
                {
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                debug!(%connection, error = %e, "malformed frame, closing");
                break;
            }
            Err(e) => {
                debug!(%connection, error = %e, "read ended");
                break;
            }
        }
    }
    let _ = tx.send(InternalEvent::Disconnected { connection });
}
