//! Value Module
//!
//! Typed values and the flag scheme that carries their type across the wire.
//!
//! ## Flags
//! ```text
//! ┌──────┬──────────────────────┬──────────────────────────────────┐
//! │ Flag │ Value kind           │ Payload                          │
//! ├──────┼──────────────────────┼──────────────────────────────────┤
//! │  0   │ String / Bytes       │ raw bytes                        │
//! │  1   │ Integer              │ decimal ASCII                    │
//! │  2   │ Float                │ decimal ASCII                    │
//! │  3   │ Boolean              │ "1" / "0"                        │
//! │  4   │ Null / List / Map    │ 0x01 + bincode(value tree)       │
//! └──────┴──────────────────────┴──────────────────────────────────┘
//! ```

mod compound;
mod envelope;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

pub use compound::{COMPOUND_FORMAT_VERSION, MAX_NESTING_DEPTH};
pub use envelope::{deserialize, serialize, Envelope, Flag};

/// A value that can be stored in and read back from the cache
///
/// `Deserialize` is implemented by hand and rejects lists and maps nested
/// deeper than [`MAX_NESTING_DEPTH`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// UTF-8 text
    String(String),

    /// Opaque bytes (stored with the string flag)
    Bytes(Vec<u8>),

    Integer(i64),

    Float(f64),

    Boolean(bool),

    /// Absent value (compound encoding)
    Null,

    /// Ordered sequence (compound encoding)
    List(Vec<Value>),

    /// String-keyed mapping (compound encoding)
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// The flag this value is stored under
    pub fn flag(&self) -> Flag {
        match self {
            Value::String(_) | Value::Bytes(_) => Flag::String,
            Value::Integer(_) => Flag::Integer,
            Value::Float(_) => Flag::Float,
            Value::Boolean(_) => Flag::Boolean,
            Value::Null | Value::List(_) | Value::Map(_) => Flag::Serialized,
        }
    }

    /// Human-readable name of the value's kind
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, item)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}
