//! Error types for memtext
//!
//! Hard failures only. Expected negative results (cache miss, not stored,
//! key exists, key not found on delete) are reported through
//! [`Outcome`](crate::Outcome) and never show up here.

use thiserror::Error;

use crate::network::{ConnectionId, Endpoint};
use crate::protocol::{CommandType, ErrorKind};

/// Result type alias using MemcacheError
pub type Result<T> = std::result::Result<T, MemcacheError>;

/// Unified error type for memtext operations
#[derive(Debug, Error)]
pub enum MemcacheError {
    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    /// Socket could not be opened, or an established socket failed mid-request
    #[error("Error \"{reason}\" while connecting to Memcached on host: {endpoint} (id: {id})")]
    Connection {
        endpoint: Endpoint,
        id: ConnectionId,
        reason: String,
    },

    // -------------------------------------------------------------------------
    // Request Errors (raised before any I/O)
    // -------------------------------------------------------------------------
    #[error("The command \"{0}\" is not allowed")]
    UnsupportedCommand(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// The daemon answered with `ERROR`, `CLIENT_ERROR` or `SERVER_ERROR`
    #[error("{kind} \"{message}\" while sending command \"{command}\" to host \"{endpoint}\"")]
    Protocol {
        command: CommandType,
        endpoint: Endpoint,
        kind: ErrorKind,
        message: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
