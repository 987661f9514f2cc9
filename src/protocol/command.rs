//! Command definitions
//!
//! The three storage commands this client speaks, validated and with their
//! payload already serialized.

use std::fmt;
use std::str::FromStr;

use crate::error::{MemcacheError, Result};
use crate::value::{self, Envelope, Value};

/// Longest key the daemon accepts
pub const MAX_KEY_LENGTH: usize = 250;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Set,
    Get,
    Delete,
}

impl CommandType {
    /// Wire name of the command
    pub fn as_str(self) -> &'static str {
        match self {
            CommandType::Set => "set",
            CommandType::Get => "get",
            CommandType::Delete => "delete",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandType {
    type Err = MemcacheError;

    /// Only `set`, `get` and `delete` are allowed; anything else is rejected
    fn from_str(name: &str) -> Result<Self> {
        match name {
            "set" => Ok(CommandType::Set),
            "get" => Ok(CommandType::Get),
            "delete" => Ok(CommandType::Delete),
            other => Err(MemcacheError::UnsupportedCommand(other.to_string())),
        }
    }
}

/// A validated command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Store a value
    Set {
        key: String,
        envelope: Envelope,
        exptime: u32,
    },

    /// Fetch a value
    Get { key: String },

    /// Remove a value
    Delete { key: String },
}

impl Command {
    /// Build a `set`, serializing the value
    pub fn set(key: impl Into<String>, value: &Value, exptime: u32) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;
        let envelope = value::serialize(value)?;
        Ok(Command::Set {
            key,
            envelope,
            exptime,
        })
    }

    /// Build a `get`
    pub fn get(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Command::Get { key })
    }

    /// Build a `delete`
    pub fn delete(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Command::Delete { key })
    }

    /// Build a command from its wire name
    ///
    /// The name is checked first, so unsupported commands fail before the key
    /// or value are looked at.
    pub fn from_name(name: &str, key: &str, value: Option<&Value>, exptime: u32) -> Result<Self> {
        match name.parse::<CommandType>()? {
            CommandType::Set => {
                let value = value.ok_or_else(|| {
                    MemcacheError::Serialization("set requires a value".to_string())
                })?;
                Command::set(key, value, exptime)
            }
            CommandType::Get => Command::get(key),
            CommandType::Delete => Command::delete(key),
        }
    }

    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Set { .. } => CommandType::Set,
            Command::Get { .. } => CommandType::Get,
            Command::Delete { .. } => CommandType::Delete,
        }
    }

    /// Key the command operates on
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. } | Command::Get { key } | Command::Delete { key } => key,
        }
    }
}

/// Reject keys the text protocol cannot carry
///
/// Keys are 1 to 250 bytes without whitespace or control characters.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(MemcacheError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(MemcacheError::InvalidKey(format!(
            "key is {} bytes long (max {})",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }
    if let Some(c) = key.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(MemcacheError::InvalidKey(format!(
            "key {:?} contains forbidden character {:?}",
            key, c
        )));
    }
    Ok(())
}
