// TCP client for connecting to the relay.
//
// Provides a non-blocking interface for a game loop to talk to the relay:
// - `connect()` opens the socket on the calling thread and waits for the
//   relay's `Welcome` (or `Rejected`), then spawns a background reader.
// - The reader thread calls `read_json()` in a loop and pushes each
//   `ServerMessage` into an `mpsc` channel.
// - The caller holds a `BufWriter<TcpStream>` for sending; writes flush
//   synchronously, which is fine for the small events involved.
// - `poll()` drains the inbox without blocking.
//
// The client has no game logic. `bulwark_sync::SyncAdapter` turns the
// polled messages into tower-map and wave changes and hands back the
// events to send.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bulwark_protocol::{ClientMessage, ConnectionId, ServerMessage, read_json, write_json};
use tracing::debug;

use crate::error::ClientError;

/// How long `connect()` waits for the relay's greeting.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Information returned by a successful `connect()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WelcomeInfo {
    pub connection_id: ConnectionId,
}

/// TCP client for relay communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
    connection_id: ConnectionId,
}

impl NetClient {
    /// Connect to a relay, wait for `Welcome`, and spawn a reader thread.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<(Self, WelcomeInfo), ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;

        let reader_stream = stream.try_clone()?;
        let writer = BufWriter::new(stream);
        let mut reader = BufReader::new(reader_stream);

        let welcome = match read_json::<_, ServerMessage>(&mut reader)? {
            ServerMessage::Welcome { connection_id } => WelcomeInfo { connection_id },
            ServerMessage::Rejected { reason } => return Err(ClientError::Rejected(reason)),
            other => return Err(ClientError::UnexpectedResponse(format!("{other:?}"))),
        };

        // Clear the handshake timeout for the long-lived reader loop.
        reader.get_ref().set_read_timeout(None)?;

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || reader_loop(reader, tx));

        Ok((
            Self {
                writer,
                inbox: rx,
                _reader_thread: Some(reader_thread),
                connection_id: welcome.connection_id,
            },
            welcome,
        ))
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Send one event to the relay.
    pub fn send(&mut self, message: &ClientMessage) -> Result<(), ClientError> {
        write_json(&mut self.writer, message)?;
        Ok(())
    }

    pub fn join_room(&mut self, room_code: &str) -> Result<(), ClientError> {
        self.send(&ClientMessage::JoinRoom {
            room_code: room_code.into(),
        })
    }

    pub fn leave_room(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::LeaveRoom)
    }

    /// Send `Goodbye` and close the connection.
    pub fn disconnect(&mut self) {
        if let Err(e) = self.send(&ClientMessage::Goodbye) {
            debug!(error = %e, "goodbye not delivered");
        }
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }

    /// Drain all queued relay messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    loop {
        match read_json::<_, ServerMessage>(&mut reader) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Owner dropped the client.
                }
            }
            Err(e) => {
                debug!(error = %e, "relay connection closed");
                break;
            }
        }
    }
}
