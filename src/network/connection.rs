//! Connection Handle
//!
//! One open stream to a daemon, reused for every request to its endpoint.

use std::io::{BufReader, Read, Write};

use crate::config::Framing;
use crate::error::Result;
use crate::protocol::{read_frame_with_limit, write_command, Command, Frame};
use super::{ConnectionId, Endpoint};

/// An open connection to a single endpoint
pub struct Connection<S> {
    /// Identifier derived from the endpoint
    id: ConnectionId,

    endpoint: Endpoint,

    /// Stream reader (buffered, one chunk per read). Writes go through
    /// `get_mut` so buffered response bytes are never lost.
    reader: BufReader<S>,

    /// Number of requests written
    requests: u64,
}

impl<S: Read + Write> Connection<S> {
    /// Wrap an open stream
    pub fn new(id: ConnectionId, endpoint: Endpoint, stream: S, chunk_size: usize) -> Self {
        Self {
            id,
            endpoint,
            reader: BufReader::with_capacity(chunk_size.max(1), stream),
            requests: 0,
        }
    }

    /// Write a command and read its complete response
    ///
    /// The write and the read never overlap.
    pub fn request(
        &mut self,
        command: &Command,
        framing: Framing,
        max_value_size: usize,
    ) -> Result<Frame> {
        self.send(command)?;
        self.receive(framing, max_value_size)
    }

    /// Write a command
    pub fn send(&mut self, command: &Command) -> Result<()> {
        write_command(self.reader.get_mut(), command)?;
        self.requests += 1;
        Ok(())
    }

    /// Read one response
    ///
    /// After an error the stream position is unknown; drop the connection.
    pub fn receive(&mut self, framing: Framing, max_value_size: usize) -> Result<Frame> {
        read_frame_with_limit(&mut self.reader, framing, max_value_size)
    }
}

impl<S> Connection<S> {
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Number of requests written on this connection
    pub fn requests_sent(&self) -> u64 {
        self.requests
    }

    /// The underlying stream
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("requests", &self.requests)
            .finish()
    }
}
