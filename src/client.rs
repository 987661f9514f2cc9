//! Client Module
//!
//! The public entry point that ties the pipeline together.
//!
//! ## Request Flow
//! 1. Build a [`Command`] (key validation, value serialization)
//! 2. Get the endpoint's connection from the [`Session`] (opened on first use)
//! 3. Write the request, read the response frame
//! 4. Classify the frame; daemon errors become [`MemcacheError::Protocol`]
//! 5. Parse the frame into an [`Outcome`]
//!
//! A connection whose reply could not be read or framed is dropped from the
//! session, so the next request starts on a fresh stream.

use std::time::Duration;

use crate::config::Config;
use crate::error::{MemcacheError, Result};
use crate::network::{Connection, Connector, Endpoint, Session, TcpConnector};
use crate::protocol::{
    classify, parse_delete, parse_get, parse_set, Classification, Command, CommandType, Frame,
    GetResult, Outcome, Response, ResponseCode,
};
use crate::value::Value;

/// Memcached text-protocol client
///
/// ## Concurrency
/// Every operation takes `&mut self` and blocks until the response is read,
/// so a client shared between threads must sit behind a lock. Interleaving two
/// requests on one socket would corrupt framing.
pub struct Client<C: Connector = TcpConnector> {
    /// Client configuration
    config: Config,

    /// Endpoint the data operations talk to
    endpoint: Endpoint,

    /// Opens streams for new connections
    connector: C,

    /// Open connections of this client
    session: Session<C::Stream>,
}

impl Client<TcpConnector> {
    /// Create a TCP client with the given config
    pub fn new(config: Config) -> Self {
        Self::with_connector(config, TcpConnector)
    }

    /// Create a TCP client for `host` on the default port
    pub fn with_host(host: impl Into<String>) -> Self {
        Self::new(Config::builder().host(host).build())
    }
}

impl<C: Connector> Client<C> {
    /// Create a client that opens streams through `connector`
    ///
    /// Uses `config.session_id` when set, otherwise a generated session id.
    pub fn with_connector(config: Config, connector: C) -> Self {
        let session = match &config.session_id {
            Some(id) => Session::with_id(id.clone()),
            None => Session::new(),
        };
        Self::with_session(config, connector, session)
    }

    /// Create a client around an existing session and its open connections
    pub fn with_session(config: Config, connector: C, session: Session<C::Stream>) -> Self {
        let endpoint = Endpoint::new(config.host.clone(), config.port);
        Self {
            config,
            endpoint,
            connector,
            session,
        }
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Return the connection to `host:port`, opening it on first use
    ///
    /// `timeout` falls back to the configured connect timeout.
    pub fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<&mut Connection<C::Stream>> {
        let endpoint = Endpoint::new(host, port);
        let timeout = timeout.or(self.config.connect_timeout);
        self.session
            .connect(&self.connector, &endpoint, timeout, self.config.read_chunk_size)
    }

    /// Drop the connection to `host:port` so the next request reopens it
    pub fn disconnect(&mut self, host: &str, port: u16) -> bool {
        self.session.disconnect(&Endpoint::new(host, port))
    }

    // =========================================================================
    // Data Operations
    // =========================================================================

    /// Store a value
    ///
    /// `exptime` is seconds from now (up to 30 days) or a unix timestamp; 0
    /// never expires. Returns `Negative` when the daemon refused to store.
    pub fn set(&mut self, key: &str, value: impl Into<Value>, exptime: u32) -> Result<Outcome<()>> {
        let command = Command::set(key, &value.into(), exptime)?;
        self.store(&command)
    }

    /// Fetch a value without metadata
    ///
    /// A miss is `Negative(NotFound)`, not an error.
    pub fn get(&mut self, key: &str) -> Result<Outcome<Value>> {
        let outcome = self.get_with_metadata(key)?;
        Ok(match outcome {
            Outcome::Success(result) => match result.into_value(key) {
                Some(value) => Outcome::Success(value),
                None => Outcome::Negative(ResponseCode::NotFound),
            },
            Outcome::Negative(code) => Outcome::Negative(code),
        })
    }

    /// Fetch a value with flags, length, CAS and frame count
    pub fn get_with_metadata(&mut self, key: &str) -> Result<Outcome<GetResult>> {
        let command = Command::get(key)?;
        self.fetch(&command)
    }

    /// Delete a value
    ///
    /// Deleting a missing key is `Negative(NotFound)`.
    pub fn delete(&mut self, key: &str) -> Result<Outcome<()>> {
        let command = Command::delete(key)?;
        self.remove(&command)
    }

    /// Run a command given by its wire name
    ///
    /// Names other than `set`, `get` and `delete` fail with
    /// [`MemcacheError::UnsupportedCommand`] before anything is written.
    pub fn execute(
        &mut self,
        name: &str,
        key: &str,
        value: Option<&Value>,
        exptime: u32,
    ) -> Result<Outcome<Response>> {
        let command = Command::from_name(name, key, value, exptime)?;

        Ok(match command.command_type() {
            CommandType::Set => self.store(&command)?.map(|()| Response::Stored),
            CommandType::Get => self.fetch(&command)?.map(Response::Values),
            CommandType::Delete => self.remove(&command)?.map(|()| Response::Deleted),
        })
    }

    fn store(&mut self, command: &Command) -> Result<Outcome<()>> {
        let frame = self.round_trip(command)?;
        Ok(parse_set(&frame).into())
    }

    fn fetch(&mut self, command: &Command) -> Result<Outcome<GetResult>> {
        let frame = self.round_trip(command)?;
        match parse_get(&frame) {
            Ok(Some(result)) => Ok(Outcome::Success(result)),
            Ok(None) => Ok(Outcome::Negative(ResponseCode::NotFound)),
            // A frame cut short leaves the rest of the reply on the socket
            Err(e @ MemcacheError::MalformedResponse(_)) => {
                self.evict();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn remove(&mut self, command: &Command) -> Result<Outcome<()>> {
        let frame = self.round_trip(command)?;
        Ok(parse_delete(&frame).into())
    }

    /// Send a command and return its classified response frame
    fn round_trip(&mut self, command: &Command) -> Result<Frame> {
        let framing = self.config.framing;
        let max_value_size = self.config.max_value_size;
        let connection = self.session.connect(
            &self.connector,
            &self.endpoint,
            self.config.connect_timeout,
            self.config.read_chunk_size,
        )?;

        tracing::debug!(
            "Sending {} \"{}\" to {}",
            command.command_type(),
            command.key(),
            connection.endpoint()
        );

        let frame = match connection.request(command, framing, max_value_size) {
            Ok(frame) => frame,
            Err(MemcacheError::Io(e)) => {
                tracing::warn!("I/O error on connection to {}: {}", connection.endpoint(), e);
                let err = MemcacheError::Connection {
                    endpoint: connection.endpoint().clone(),
                    id: connection.id().clone(),
                    reason: e.to_string(),
                };
                self.evict();
                return Err(err);
            }
            Err(e) => {
                self.evict();
                return Err(e);
            }
        };

        tracing::trace!("Received frame: {}", frame);

        match classify(&frame) {
            Classification::Success => Ok(frame),
            Classification::Failed { kind, message } => {
                tracing::warn!(
                    "{} from {} for {}: {}",
                    kind,
                    self.endpoint,
                    command.command_type(),
                    message
                );
                Err(MemcacheError::Protocol {
                    command: command.command_type(),
                    endpoint: self.endpoint.clone(),
                    kind,
                    message,
                })
            }
        }
    }

    /// Drop the data connection once its stream position is unknown
    fn evict(&mut self) {
        self.session.disconnect(&self.endpoint);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Endpoint used by the data operations
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn session(&self) -> &Session<C::Stream> {
        &self.session
    }

    /// Give up the client, keeping its session and open connections
    pub fn into_session(self) -> Session<C::Stream> {
        self.session
    }
}
