//! Network Module
//!
//! Connection management for the client.
//!
//! ## Architecture
//! - One [`Session`] per client, mapping endpoint digests to connections
//! - One reusable [`Connection`] per (host, port) within a session
//! - Streams opened through a [`Connector`] (TCP by default)

mod connector;
mod connection;
mod session;

pub use connector::{Connector, TcpConnector};
pub use connection::Connection;
pub use session::{ConnectionId, Endpoint, Session, SessionId};
