//! # memtext
//!
//! A blocking client for the Memcached classic text protocol with:
//! - `set`, `get` and `delete` over plain TCP
//! - Typed values carried across the wire in the item flags
//! - One reusable connection per endpoint, scoped to a client session
//! - Cache misses and refused writes as ordinary results, not errors
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Client                               │
//! │               set / get / delete / execute                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Command   │          │   Session   │
//!   │  + Values   │          │ (conn cache)│
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          ▼                        ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Codec    │─────────▶│ Connection  │
//!   │ (encode /   │◀─────────│  (stream)   │
//!   │   frame)    │          └─────────────┘
//!   └──────┬──────┘
//!          ▼
//!   ┌─────────────┐
//!   │  Response   │
//!   │ (classify / │
//!   │   parse)    │
//!   └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use memtext::{Client, Config, Outcome, Value};
//!
//! let mut client = Client::new(Config::builder().host("127.0.0.1").build());
//!
//! client.set("answer", 42i64, 0)?;
//! match client.get("answer")? {
//!     Outcome::Success(Value::Integer(n)) => println!("answer = {}", n),
//!     Outcome::Success(other) => println!("unexpected {}", other.kind()),
//!     Outcome::Negative(code) => println!("miss ({})", code),
//! }
//! # Ok::<(), memtext::MemcacheError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod value;
pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MemcacheError, Result};
pub use config::{Config, Framing};
pub use client::Client;
pub use protocol::{GetResult, Item, Outcome, Response, ResponseCode};
pub use value::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of memtext
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
