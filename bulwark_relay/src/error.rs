// Error types for starting the relay and for `NetClient`.
//
// Per-message failures inside the running relay (malformed frames,
// unauthorized events, failed writes) are not errors at this level: they
// end a connection or drop an event and are only logged.

use std::io;

use thiserror::Error;

/// Failure to bring the relay up.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("failed to spawn relay thread: {0}")]
    Thread(#[source] io::Error),
}

/// Failure inside `NetClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("rejected by relay: {0}")]
    Rejected(String),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}
