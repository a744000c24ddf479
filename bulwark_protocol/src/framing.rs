// Length-delimited message framing over TCP.
//
// Wire format: a 4-byte big-endian length prefix followed by that many bytes
// of JSON. `write_message` / `read_message` move raw frames; `write_json` /
// `read_json` add serde on top and are what the relay and `NetClient` use.
// Serde failures surface as `io::ErrorKind::InvalidData` so callers deal
// with a single error type per socket.
//
// `MAX_MESSAGE_SIZE` bounds allocation for a hostile length prefix. The
// largest legitimate frame is a `HostState` snapshot.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Maximum frame payload (16 MiB).
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Write one frame and flush.
pub fn write_message<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    let len = msg.len();
    if len > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    #[expect(clippy::cast_possible_truncation)]
    let len_bytes = (len as u32).to_be_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(msg)?;
    writer.flush()
}

/// Read one frame.
///
/// Returns `UnexpectedEof` if the stream closes before or during a frame and
/// `InvalidData` if the prefix exceeds `MAX_MESSAGE_SIZE`.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` to JSON and write it as one frame.
pub fn write_json<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> io::Result<()> {
    let json = serde_json::to_vec(msg).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    write_message(writer, &json)
}

/// Read one frame and deserialize it from JSON.
pub fn read_json<R: Read, T: DeserializeOwned>(reader: &mut R) -> io::Result<T> {
    let bytes = read_message(reader)?;
    serde_json::from_slice(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::message::{ClientMessage, ServerMessage};
    use crate::types::ConnectionId;

    #[test]
    fn frame_has_big_endian_length_prefix() {
        let mut buf = Vec::new();
        write_message(&mut buf, b"hello").unwrap();
        assert_eq!(&buf[..4], &[0, 0, 0, 5]);
        assert_eq!(&buf[4..], b"hello");
    }

    #[test]
    fn rejects_oversized_write() {
        let big = vec![0u8; MAX_MESSAGE_SIZE as usize + 1];
        let mut buf = Vec::new();
        let err = write_message(&mut buf, &big).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_oversized_read() {
        let fake_len = (MAX_MESSAGE_SIZE + 1).to_be_bytes();
        let mut cursor = Cursor::new(fake_len.to_vec());
        let err = read_message(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_prefix_is_unexpected_eof() {
        let mut cursor = Cursor::new(vec![0u8, 1]);
        let err = read_message(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn truncated_payload_is_unexpected_eof() {
        let mut buf = Vec::new();
        write_message(&mut buf, b"abcdef").unwrap();
        buf.truncate(7);
        let err = read_message(&mut Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn json_frames_in_sequence() {
        let mut buf = Vec::new();
        write_json(&mut buf, &ClientMessage::LeaveRoom).unwrap();
        write_json(
            &mut buf,
            &ServerMessage::Welcome {
                connection_id: ConnectionId(7),
            },
        )
        .unwrap();

        let mut cursor = Cursor::new(buf);
        let first: ClientMessage = read_json(&mut cursor).unwrap();
        let second: ServerMessage = read_json(&mut cursor).unwrap();
        assert_eq!(first, ClientMessage::LeaveRoom);
        assert_eq!(
            second,
            ServerMessage::Welcome {
                connection_id: ConnectionId(7)
            }
        );
    }

    #[test]
    fn malformed_json_is_invalid_data() {
        let mut buf = Vec::new();
        write_message(&mut buf, b"{not json").unwrap();
        let err = read_json::<_, ClientMessage>(&mut Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
