//! TLS record framing: one record is a 5-byte header (content type, protocol
//! version, big-endian payload length) followed by that many payload bytes.
//! The payload is opaque; nothing here decrypts or interprets handshake
//! contents beyond the header.

use crate::error::{CoreError, CoreErrorKind};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

pub const RECORD_HEADER_LEN: usize = 5;
pub const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub content_type: u8,
    pub version: (u8, u8),
    pub payload_len: u16,
}

impl RecordHeader {
    pub fn parse(header: &[u8; RECORD_HEADER_LEN]) -> Self {
        Self {
            content_type: header[0],
            version: (header[1], header[2]),
            payload_len: u16::from_be_bytes([header[3], header[4]]),
        }
    }
}

/// Reads exactly one TLS record off the stream and returns header plus payload
/// unmodified. The bytes are consumed, not peeked; the same record is later
/// replayed onto a different connection, so a peek would duplicate it.
pub async fn read_record<S>(stream: &mut S) -> Result<Bytes, CoreError>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; RECORD_HEADER_LEN];
    stream.read_exact(&mut header).await.map_err(truncated)?;

    let parsed = RecordHeader::parse(&header);
    let total_len = RECORD_HEADER_LEN + parsed.payload_len as usize;
    let mut record = BytesMut::with_capacity(total_len);
    record.extend_from_slice(&header);
    record.resize(total_len, 0);
    stream
        .read_exact(&mut record[RECORD_HEADER_LEN..])
        .await
        .map_err(truncated)?;

    Ok(record.freeze())
}

fn truncated(error: std::io::Error) -> CoreError {
    if error.kind() == std::io::ErrorKind::UnexpectedEof {
        CoreError::new(CoreErrorKind::TruncatedRecord, "stream closed mid-record")
    } else {
        CoreError::from(error)
    }
}
