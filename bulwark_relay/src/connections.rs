// Write halves of every live connection.
//
// The relay's event thread is the only writer to client sockets; reader
// threads hold their own cloned read half. `ConnectionTable` assigns
// `ConnectionId`s in accept order (never reused within one relay run) and
// delivers the router's output. A write failure is logged and otherwise
// ignored: the matching reader thread sees the same broken socket and
// reports `Disconnected`, which is where cleanup happens.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::{Shutdown, TcpStream};

use bulwark_protocol::{ConnectionId, ServerMessage, write_json};
use tracing::{debug, warn};

use crate::router::Delivery;

#[derive(Default)]
pub struct ConnectionTable {
    writers: BTreeMap<ConnectionId, BufWriter<TcpStream>>,
    next_id: u32,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the write half of a new connection and assign it an ID.
    pub fn add(&mut self, stream: TcpStream) -> ConnectionId {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        self.writers.insert(id, BufWriter::new(stream));
        id
    }

    /// Drop the write half. Closing the socket itself is left to the OS once
    /// the reader's clone is gone too.
    pub fn remove(&mut self, id: ConnectionId) {
        self.writers.remove(&id);
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.writers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    /// Shut down every socket so blocked reader threads return, then forget
    /// them all.
    pub fn close_all(&mut self) {
        for (id, writer) in std::mem::take(&mut self.writers) {
            if let Err(e) = writer.get_ref().shutdown(Shutdown::Both) {
                debug!(connection = %id, error = %e, "shutdown failed");
            }
        }
    }

    /// Write one message to one connection.
    pub fn send_to(&mut self, id: ConnectionId, message: &ServerMessage) {
        let Some(writer) = self.writers.get_mut(&id) else {
            debug!(connection = %id, "send to unknown connection skipped");
            return;
        };
        if let Err(e) = write_json(writer, message) {
            warn!(connection = %id, error = %e, "write failed");
        }
    }

    /// Write every delivery in order.
    pub fn deliver(&mut self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            self.send_to(delivery.to, &delivery.message);
        }
    }
}
