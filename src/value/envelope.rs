//! Value envelope
//!
//! Maps a [`Value`] to `(payload, flag, length)` and back.

use std::fmt;

use crate::error::{MemcacheError, Result};
use super::{compound, Value};

/// Type tag stored next to every value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Flag {
    String = 0,
    Integer = 1,
    Float = 2,
    Boolean = 3,
    Serialized = 4,
}

impl Flag {
    /// Parse a raw wire flag. Returns `None` for flags this client never writes.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Flag::String),
            1 => Some(Flag::Integer),
            2 => Some(Flag::Float),
            3 => Some(Flag::Boolean),
            4 => Some(Flag::Serialized),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_raw())
    }
}

/// A serialized value ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Encoded payload
    pub bytes: Vec<u8>,

    /// Type tag
    pub flag: Flag,
}

impl Envelope {
    /// Payload length in bytes (the `<bytes>` field of `set`)
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode a value into its wire envelope
pub fn serialize(value: &Value) -> Result<Envelope> {
    let bytes = match value {
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Bytes(b) => b.clone(),
        Value::Integer(i) => i.to_string().into_bytes(),
        // `{}` on f64 prints the shortest string that parses back exactly
        Value::Float(f) => f.to_string().into_bytes(),
        Value::Boolean(b) => if *b { b"1".to_vec() } else { b"0".to_vec() },
        Value::Null | Value::List(_) | Value::Map(_) => compound::encode(value)?,
    };

    Ok(Envelope {
        bytes,
        flag: value.flag(),
    })
}

/// Decode a payload according to its raw wire flag
///
/// Flags are matched exactly, not as a bit set. Any flag other than 0 to 4
/// (for example `5`, or values written by other clients) is read as a plain
/// string, never as a compound payload.
pub fn deserialize(bytes: &[u8], flags: u32) -> Result<Value> {
    match Flag::from_raw(flags) {
        Some(Flag::Integer) => {
            let text = ascii(bytes, "integer")?;
            text.parse::<i64>().map(Value::Integer).map_err(|e| {
                MemcacheError::Serialization(format!("invalid integer payload {:?}: {}", text, e))
            })
        }
        Some(Flag::Float) => {
            let text = ascii(bytes, "float")?;
            text.parse::<f64>().map(Value::Float).map_err(|e| {
                MemcacheError::Serialization(format!("invalid float payload {:?}: {}", text, e))
            })
        }
        Some(Flag::Boolean) => match bytes {
            b"1" | b"true" => Ok(Value::Boolean(true)),
            b"0" | b"" | b"false" => Ok(Value::Boolean(false)),
            other => Err(MemcacheError::Serialization(format!(
                "invalid boolean payload {:?}",
                String::from_utf8_lossy(other)
            ))),
        },
        Some(Flag::Serialized) => compound::decode(bytes),
        Some(Flag::String) | None => Ok(match String::from_utf8(bytes.to_vec()) {
            Ok(s) => Value::String(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        }),
    }
}

fn ascii<'a>(bytes: &'a [u8], kind: &str) -> Result<&'a str> {
    std::str::from_utf8(bytes)
        .map(str::trim)
        .map_err(|_| MemcacheError::Serialization(format!("{} payload is not ASCII", kind)))
}
