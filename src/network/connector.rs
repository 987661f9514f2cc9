//! Transport factory
//!
//! Opens the byte stream behind a [`Connection`](super::Connection).

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::Endpoint;

/// Opens streams to endpoints
///
/// [`TcpConnector`] is the real implementation; tests plug in in-memory
/// streams.
pub trait Connector {
    type Stream: Read + Write;

    /// Open a new stream to `endpoint`
    fn open(&self, endpoint: &Endpoint, timeout: Option<Duration>) -> io::Result<Self::Stream>;
}

/// Plain TCP connector
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn open(&self, endpoint: &Endpoint, timeout: Option<Duration>) -> io::Result<TcpStream> {
        let addr = (endpoint.host(), endpoint.port());

        let stream = match timeout {
            None => TcpStream::connect(addr)?,
            Some(timeout) => {
                // connect_timeout takes a single address, so try each in turn
                let mut last_error = None;
                let mut connected = None;
                for socket_addr in addr.to_socket_addrs()? {
                    match TcpStream::connect_timeout(&socket_addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(e) => last_error = Some(e),
                    }
                }
                match connected {
                    Some(stream) => stream,
                    None => {
                        return Err(last_error.unwrap_or_else(|| {
                            io::Error::new(
                                io::ErrorKind::NotFound,
                                format!("{} did not resolve to any address", endpoint),
                            )
                        }))
                    }
                }
            }
        };

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        Ok(stream)
    }
}
