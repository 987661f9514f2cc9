//! Configuration for memtext
//!
//! Centralized client configuration with sensible defaults.

use std::time::Duration;

use crate::network::SessionId;

/// Default Memcached port
pub const DEFAULT_PORT: u16 = 11211;

/// Default number of bytes pulled from the socket per read
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;

/// Default largest value accepted in a response (1 MB, the daemon's item limit)
pub const DEFAULT_MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Main configuration for a [`Client`](crate::Client) instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Endpoint Configuration
    // -------------------------------------------------------------------------
    /// Daemon host name or IP address
    pub host: String,

    /// Daemon TCP port
    pub port: u16,

    /// Timeout for opening a connection. `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,

    // -------------------------------------------------------------------------
    // Session Configuration
    // -------------------------------------------------------------------------
    /// Explicit session identifier. A fresh one is generated when unset.
    pub session_id: Option<SessionId>,

    // -------------------------------------------------------------------------
    // Response Reading
    // -------------------------------------------------------------------------
    /// How the end of a response is detected
    pub framing: Framing,

    /// Capacity of the buffered socket reader (bytes per read)
    pub read_chunk_size: usize,

    /// Largest value payload accepted in a response. Longer declared lengths
    /// fail the read instead of allocating.
    pub max_value_size: usize,
}

/// Response framing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Consume `<bytes>` of payload after every `VALUE` header before looking
    /// for terminator lines again. Payloads may contain anything.
    #[default]
    LengthAware,

    /// Stop at the first line starting with a terminator keyword, payload or
    /// not. Wire-compatible with older clients, but a payload line such as
    /// `END...` or `STORED...` cuts the response short.
    TerminatorScan,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: None,
            session_id: None,
            framing: Framing::LengthAware,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the daemon host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the daemon port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(self, ms: u64) -> Self {
        self.connect_timeout(Duration::from_millis(ms))
    }

    /// Use an explicit session identifier instead of a generated one
    pub fn session_id(mut self, id: impl Into<SessionId>) -> Self {
        self.config.session_id = Some(id.into());
        self
    }

    /// Set the framing strategy
    pub fn framing(mut self, framing: Framing) -> Self {
        self.config.framing = framing;
        self
    }

    /// Set the read chunk size (in bytes, minimum 1)
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size.max(1);
        self
    }

    /// Set the largest accepted value (in bytes)
    pub fn max_value_size(mut self, size: usize) -> Self {
        self.config.max_value_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
