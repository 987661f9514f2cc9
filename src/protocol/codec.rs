//! Protocol codec
//!
//! Request encoding and response framing for the text protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! ┌─────┬───┬───────┬───┬─────────┬───┬───────────┬───┬─────────┬──────┬─────────┬──────┐
//! │ set │ ␠ │  key  │ ␠ │  flags  │ ␠ │  exptime  │ ␠ │  bytes  │ CRLF │ payload │ CRLF │
//! └─────┴───┴───────┴───┴─────────┴───┴───────────┴───┴─────────┴──────┴─────────┴──────┘
//! ┌────────────┬───┬───────┬──────┐
//! │ get/delete │ ␠ │  key  │ CRLF │
//! └────────────┴───┴───────┴──────┘
//! ```
//!
//! ### Response Format
//! ```text
//! ┌─────────────────────────────────────────┬──────┬─────────────────┬──────┐
//! │ VALUE <key> <flags> <bytes> [<cas>]     │ CRLF │ payload (bytes) │ CRLF │  x N
//! ├─────────────────────────────────────────┼──────┼─────────────────┴──────┘
//! │ terminator (END, STORED, DELETED, ...)  │ CRLF │
//! └─────────────────────────────────────────┴──────┘
//! ```
//!
//! A response is complete once a terminator line has been read. With
//! [`Framing::LengthAware`] the payload after each `VALUE` header is consumed
//! by length, never scanned. Declared lengths above the configured maximum
//! value size are rejected before anything is allocated.

use std::io::{self, BufRead, Write};

use bytes::BytesMut;

use crate::config::{Framing, DEFAULT_MAX_VALUE_SIZE};
use crate::error::{MemcacheError, Result};
use crate::value::Value;
use super::response::{
    is_terminator, is_value_header, starts_with_terminator, trim_line_end, value_length,
};
use super::{Command, Frame};

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Field separator
pub const SEPARATOR: u8 = b' ';

// =============================================================================
// Request Encoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Vec<u8> {
    let name = command.command_type().as_str();

    match command {
        Command::Set {
            key,
            envelope,
            exptime,
        } => {
            let header = format!(
                "{} {} {} {} {}",
                name,
                key,
                envelope.flag.as_raw(),
                exptime,
                envelope.len()
            );
            let mut message = Vec::with_capacity(header.len() + envelope.len() + 2 * CRLF.len());
            message.extend_from_slice(header.as_bytes());
            message.extend_from_slice(CRLF);
            message.extend_from_slice(&envelope.bytes);
            message.extend_from_slice(CRLF);
            message
        }
        Command::Get { key } | Command::Delete { key } => {
            let mut message = Vec::with_capacity(name.len() + 1 + key.len() + CRLF.len());
            message.extend_from_slice(name.as_bytes());
            message.push(SEPARATOR);
            message.extend_from_slice(key.as_bytes());
            message.extend_from_slice(CRLF);
            message
        }
    }
}

/// Encode a command given by its wire name
///
/// Fails with [`MemcacheError::UnsupportedCommand`] for anything other than
/// `set`, `get` and `delete`.
pub fn encode_named(name: &str, key: &str, value: Option<&Value>, exptime: u32) -> Result<Vec<u8>> {
    let command = Command::from_name(name, key, value, exptime)?;
    Ok(encode_command(&command))
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Response Framing
// =============================================================================

/// Read one complete response from a stream
///
/// Blocks until a terminator line arrives. A peer that closes the stream
/// first yields an `UnexpectedEof` I/O error. Values may be at most
/// [`DEFAULT_MAX_VALUE_SIZE`] bytes.
pub fn read_frame<R: BufRead>(reader: &mut R, framing: Framing) -> Result<Frame> {
    read_frame_with_limit(reader, framing, DEFAULT_MAX_VALUE_SIZE)
}

/// Read one complete response, rejecting values above `max_value_size` bytes
pub fn read_frame_with_limit<R: BufRead>(
    reader: &mut R,
    framing: Framing,
    max_value_size: usize,
) -> Result<Frame> {
    let mut buffer = BytesMut::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Err(MemcacheError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "connection closed after {} bytes without a terminator line",
                    buffer.len()
                ),
            )));
        }
        buffer.extend_from_slice(&line);

        let content = trim_line_end(&line);
        match framing {
            Framing::LengthAware => {
                if is_value_header(content) {
                    let length = declared_length(content, max_value_size)?;
                    read_payload(reader, &mut buffer, length)?;
                    continue;
                }
                if is_terminator(content) {
                    break;
                }
            }
            Framing::TerminatorScan => {
                if starts_with_terminator(content) {
                    break;
                }
            }
        }
    }

    Ok(Frame::new(buffer.freeze()))
}

/// Payload length of a `VALUE` header, checked against the size limit
fn declared_length(header: &[u8], max_value_size: usize) -> Result<usize> {
    match value_length(header) {
        Some(length) if length <= max_value_size => Ok(length),
        Some(length) => Err(MemcacheError::MalformedResponse(format!(
            "value of {} bytes exceeds the {} byte limit",
            length, max_value_size
        ))),
        None => Err(MemcacheError::MalformedResponse(format!(
            "invalid length in VALUE header \"{}\"",
            String::from_utf8_lossy(header)
        ))),
    }
}

/// Consume a value payload and its trailing CRLF
fn read_payload<R: BufRead>(reader: &mut R, buffer: &mut BytesMut, length: usize) -> Result<()> {
    let start = buffer.len();
    let end = start
        .checked_add(length)
        .and_then(|end| end.checked_add(CRLF.len()))
        .ok_or_else(|| {
            MemcacheError::MalformedResponse(format!("payload of {} bytes is too large", length))
        })?;
    buffer.resize(end, 0);
    reader.read_exact(&mut buffer[start..])?;

    if &buffer[start + length..] != CRLF {
        return Err(MemcacheError::MalformedResponse(format!(
            "payload of {} bytes is not followed by CRLF",
            length
        )));
    }
    Ok(())
}
