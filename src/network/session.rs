//! Session
//!
//! Owns the open connections of one client, keyed by endpoint digest.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

use sha1::{Digest, Sha1};
use uuid::Uuid;

use crate::error::{MemcacheError, Result};
use super::{Connection, Connector};

// =============================================================================
// Identifiers
// =============================================================================

/// A daemon address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Deterministic identifier of an endpoint: hex SHA-1 of `"<host>.<port>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn for_endpoint(endpoint: &Endpoint) -> Self {
        let digest = Sha1::digest(format!("{}.{}", endpoint.host(), endpoint.port()).as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Session
// =============================================================================

/// Connection cache of one client
///
/// The same endpoint always maps to the same connection once opened.
/// Connections are never closed or health-checked here; callers drop a stale
/// one with [`Session::disconnect`].
pub struct Session<S> {
    id: SessionId,
    connections: HashMap<ConnectionId, Connection<S>>,
}

impl<S> Session<S> {
    /// Create a session with a generated identifier
    pub fn new() -> Self {
        Self::with_id(SessionId::generate())
    }

    pub fn with_id(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            connections: HashMap::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Number of open connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn contains(&self, endpoint: &Endpoint) -> bool {
        self.connections
            .contains_key(&ConnectionId::for_endpoint(endpoint))
    }

    pub fn get(&self, endpoint: &Endpoint) -> Option<&Connection<S>> {
        self.connections.get(&ConnectionId::for_endpoint(endpoint))
    }

    /// Drop the connection to `endpoint`, closing its stream
    ///
    /// Returns false if none was open.
    pub fn disconnect(&mut self, endpoint: &Endpoint) -> bool {
        let removed = self
            .connections
            .remove(&ConnectionId::for_endpoint(endpoint))
            .is_some();
        if removed {
            tracing::debug!("Session {} dropped connection to {}", self.id, endpoint);
        }
        removed
    }
}

impl<S: Read + Write> Session<S> {
    /// Return the connection to `endpoint`, opening it on first use
    pub fn connect<C>(
        &mut self,
        connector: &C,
        endpoint: &Endpoint,
        timeout: Option<Duration>,
        chunk_size: usize,
    ) -> Result<&mut Connection<S>>
    where
        C: Connector<Stream = S>,
    {
        let id = ConnectionId::for_endpoint(endpoint);

        match self.connections.entry(id) {
            Entry::Occupied(entry) => {
                tracing::trace!("Session {} reusing connection to {}", self.id, endpoint);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let id = entry.key().clone();
                let stream = connector.open(endpoint, timeout).map_err(|e| {
                    tracing::warn!("Failed to connect to {} (id {}): {}", endpoint, id, e);
                    MemcacheError::Connection {
                        endpoint: endpoint.clone(),
                        id: id.clone(),
                        reason: e.to_string(),
                    }
                })?;

                tracing::debug!("Session {} connected to {} (id {})", self.id, endpoint, id);
                Ok(entry.insert(Connection::new(id, endpoint.clone(), stream, chunk_size)))
            }
        }
    }
}

impl<S> Default for Session<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("connections", &self.connections.len())
            .finish()
    }
}
