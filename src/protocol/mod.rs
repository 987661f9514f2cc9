//! Protocol Module
//!
//! The Memcached classic text protocol, restricted to `set`, `get` and
//! `delete`.
//!
//! ## Requests
//! ```text
//! set <key> <flags> <exptime> <bytes>\r\n
//! <payload>\r\n
//! get <key>\r\n
//! delete <key>\r\n
//! ```
//!
//! ## Responses
//! ```text
//! VALUE <key> <flags> <bytes> [<cas>]\r\n
//! <payload>\r\n
//! ...
//! END\r\n
//!
//! STORED | NOT_STORED | EXISTS | NOT_FOUND\r\n      (set)
//! DELETED | NOT_FOUND\r\n                           (delete)
//! ERROR | CLIENT_ERROR <msg> | SERVER_ERROR <msg>\r\n
//! ```

mod command;
mod response;
mod codec;

pub use command::{validate_key, Command, CommandType, MAX_KEY_LENGTH};
pub use response::{
    classify, parse_delete, parse_get, parse_set, Classification, ErrorKind, Frame, GetResult,
    Item, Outcome, Response, ResponseCode, Segment, TERMINATORS,
};
pub use codec::{
    encode_command, encode_named, read_frame, read_frame_with_limit, write_command, CRLF,
    SEPARATOR,
};
