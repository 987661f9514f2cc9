//! Response definitions
//!
//! Frames read from the daemon, their classification, and the
//! command-specific parsers that turn them into typed results.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::error::{MemcacheError, Result};
use crate::value::{self, Value};

/// Lines that end a response
pub const TERMINATORS: &[&str] = &[
    "END",
    "STORED",
    "NOT_STORED",
    "DELETED",
    "NOT_FOUND",
    "EXISTS",
    "ERROR",
    "CLIENT_ERROR",
    "SERVER_ERROR",
    "OK",
    "RESET",
    "VERSION",
];

const VALUE_HEADER: &str = "VALUE";

// =============================================================================
// Response Codes
// =============================================================================

/// Outcome classification of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Success,
    Failure,
    NotFound,
    NotStored,
    DataExists,
}

impl ResponseCode {
    /// Numeric code as used by libmemcached
    pub fn as_raw(self) -> u16 {
        match self {
            ResponseCode::Success => 0,
            ResponseCode::Failure => 1,
            ResponseCode::DataExists => 12,
            ResponseCode::NotStored => 14,
            ResponseCode::NotFound => 16,
        }
    }

    pub fn is_success(self) -> bool {
        self == ResponseCode::Success
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseCode::Success => "SUCCESS",
            ResponseCode::Failure => "FAILURE",
            ResponseCode::NotFound => "NOT_FOUND",
            ResponseCode::NotStored => "NOT_STORED",
            ResponseCode::DataExists => "DATA_EXISTS",
        };
        f.write_str(name)
    }
}

/// Result of an operation that reached the daemon
///
/// Negative results (miss, not stored, exists, not found) are ordinary values
/// here, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Negative(ResponseCode),
}

impl<T> Outcome<T> {
    /// Response code of this outcome
    pub fn code(&self) -> ResponseCode {
        match self {
            Outcome::Success(_) => ResponseCode::Success,
            Outcome::Negative(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Negative(_) => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Negative(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Negative(code) => Outcome::Negative(code),
        }
    }
}

impl Outcome<()> {
    fn from_code(code: ResponseCode) -> Self {
        if code.is_success() {
            Outcome::Success(())
        } else {
            Outcome::Negative(code)
        }
    }
}

impl From<ResponseCode> for Outcome<()> {
    fn from(code: ResponseCode) -> Self {
        Outcome::from_code(code)
    }
}

/// Parsed reply of a command dispatched by name
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Stored,
    Values(GetResult),
    Deleted,
}

// =============================================================================
// Frames
// =============================================================================

/// Raw bytes of one complete response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

/// A piece of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// A status or header line, without its line terminator
    Line(&'a [u8]),

    /// Data following a `VALUE` header, without its trailing CRLF.
    /// Shorter than declared when the frame ended early.
    Payload(&'a [u8]),
}

impl Frame {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Split the frame into lines and payloads
    ///
    /// Payload boundaries come from the `<bytes>` field of each `VALUE` header.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let buf = &self.bytes[..];
        let mut segments = Vec::new();
        let mut pos = 0;

        while pos < buf.len() {
            let (line, next) = match buf[pos..].iter().position(|&b| b == b'\n') {
                Some(offset) => (trim_line_end(&buf[pos..pos + offset + 1]), pos + offset + 1),
                None => (&buf[pos..], buf.len()),
            };
            segments.push(Segment::Line(line));
            pos = next;

            if let Some(length) = value_length(line) {
                let end = pos.saturating_add(length).min(buf.len());
                segments.push(Segment::Payload(&buf[pos..end]));
                pos = end;
                if buf[pos..].starts_with(b"\r\n") {
                    pos += 2;
                }
            }
        }

        segments
    }

    /// Lines of the frame that are not value payload
    pub fn status_lines(&self) -> Vec<&[u8]> {
        self.segments()
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Line(line) => Some(line),
                Segment::Payload(_) => None,
            })
            .collect()
    }

    /// First line of the frame
    pub fn first_line(&self) -> &[u8] {
        let buf = &self.bytes[..];
        match buf.iter().position(|&b| b == b'\n') {
            Some(offset) => trim_line_end(&buf[..offset + 1]),
            None => buf,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes).escape_debug())
    }
}

/// Strip a trailing `\n` or `\r\n`
pub(crate) fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn first_token(line: &[u8]) -> &[u8] {
    line.split(|&b| b == b' ').next().unwrap_or(line)
}

/// Whether `line` is a `VALUE` header (keyword matched case-insensitively)
pub(crate) fn is_value_header(line: &[u8]) -> bool {
    is_value_keyword(first_token(line))
}

fn is_value_keyword(token: &[u8]) -> bool {
    token.eq_ignore_ascii_case(VALUE_HEADER.as_bytes())
}

/// Declared payload length when `line` is a `VALUE` header
pub(crate) fn value_length(line: &[u8]) -> Option<usize> {
    let mut fields = line.split(|&b| b == b' ').filter(|f| !f.is_empty());
    if !is_value_keyword(fields.next()?) {
        return None;
    }
    let length = fields.nth(2)?;
    std::str::from_utf8(length).ok()?.parse().ok()
}

/// Whether the first token of `line` is a terminator keyword
pub(crate) fn is_terminator(line: &[u8]) -> bool {
    let token = first_token(line);
    TERMINATORS
        .iter()
        .any(|t| token.eq_ignore_ascii_case(t.as_bytes()))
}

/// Whether `line` begins with a terminator keyword (prefix match)
pub(crate) fn starts_with_terminator(line: &[u8]) -> bool {
    TERMINATORS.iter().any(|t| {
        line.len() >= t.len() && line[..t.len()].eq_ignore_ascii_case(t.as_bytes())
    })
}

// =============================================================================
// Classification
// =============================================================================

/// Kind of error reported by the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `ERROR`: unknown command or malformed request
    Generic,

    /// `CLIENT_ERROR <message>`
    Client,

    /// `SERVER_ERROR <message>`
    Server,
}

impl ErrorKind {
    fn marker(self) -> &'static str {
        match self {
            ErrorKind::Generic => "ERROR",
            ErrorKind::Client => "CLIENT_ERROR",
            ErrorKind::Server => "SERVER_ERROR",
        }
    }

    fn matches(self, line: &[u8]) -> bool {
        first_token(line).eq_ignore_ascii_case(self.marker().as_bytes())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Generic => "Error",
            ErrorKind::Client => "Client error",
            ErrorKind::Server => "Server error",
        };
        f.write_str(name)
    }
}

/// Whether a frame reports an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Success,
    Failed { kind: ErrorKind, message: String },
}

/// Classify a frame
///
/// Markers are searched in priority order: generic `ERROR`, then
/// `CLIENT_ERROR`, then `SERVER_ERROR`. Value payloads are never inspected.
pub fn classify(frame: &Frame) -> Classification {
    let lines = frame.status_lines();

    for kind in [ErrorKind::Generic, ErrorKind::Client, ErrorKind::Server] {
        if let Some(line) = lines.iter().find(|line| kind.matches(line)) {
            return Classification::Failed {
                kind,
                message: String::from_utf8_lossy(line).into_owned(),
            };
        }
    }

    Classification::Success
}

// =============================================================================
// GET
// =============================================================================

/// One value returned by `get`
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub key: String,

    /// Decoded value
    pub value: Value,

    /// Raw flags as stored
    pub flags: u32,

    /// Payload length in bytes
    pub length: usize,

    /// CAS unique, when the daemon sent one
    pub cas: Option<u64>,

    /// Number of physical lines the payload spanned
    pub frames: usize,
}

/// All values returned by one `get`
#[derive(Debug, Clone, PartialEq)]
pub struct GetResult {
    items: BTreeMap<String, Item>,
    frame: Frame,
}

impl GetResult {
    pub fn get(&self, key: &str) -> Option<&Item> {
        self.items.get(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// The raw frame the items were parsed from
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Take the value stored under `key`
    pub fn into_value(mut self, key: &str) -> Option<Value> {
        self.items.remove(key).map(|item| item.value)
    }
}

/// Parse a `get` response
///
/// Returns `None` on a miss (no `VALUE` entries before `END`).
pub fn parse_get(frame: &Frame) -> Result<Option<GetResult>> {
    let mut items = BTreeMap::new();
    let mut segments = frame.segments().into_iter();

    while let Some(segment) = segments.next() {
        let line = match segment {
            Segment::Line(line) => line,
            Segment::Payload(_) => {
                return Err(MemcacheError::MalformedResponse(
                    "payload without VALUE header".to_string(),
                ))
            }
        };

        if line.eq_ignore_ascii_case(b"END") {
            break;
        }

        let header = String::from_utf8_lossy(line);
        let fields: Vec<&str> = header.split(' ').filter(|f| !f.is_empty()).collect();

        if !fields.first().map_or(false, |f| is_value_keyword(f.as_bytes())) {
            return Err(MemcacheError::MalformedResponse(format!(
                "Awaited \"{}\" but received \"{}\"",
                VALUE_HEADER,
                fields.first().copied().unwrap_or("")
            )));
        }
        if fields.len() < 4 {
            return Err(MemcacheError::MalformedResponse(format!(
                "incomplete VALUE header \"{}\"",
                header
            )));
        }

        let key = fields[1].to_string();
        let flags = parse_field::<u32>(fields[2], "flags", &header)?;
        let length = parse_field::<usize>(fields[3], "length", &header)?;
        let cas = fields
            .get(4)
            .map(|cas| parse_field::<u64>(cas, "cas", &header))
            .transpose()?;

        let payload = match segments.next() {
            Some(Segment::Payload(payload)) => payload,
            _ => {
                return Err(MemcacheError::MalformedResponse(format!(
                    "missing payload for key \"{}\"",
                    key
                )))
            }
        };
        if payload.len() != length {
            return Err(MemcacheError::MalformedResponse(format!(
                "truncated payload for key \"{}\": expected {} bytes, got {}",
                key,
                length,
                payload.len()
            )));
        }

        let frames = payload.windows(2).filter(|w| *w == b"\r\n").count() + 1;
        let value = value::deserialize(payload, flags)?;

        items.insert(
            key.clone(),
            Item {
                key,
                value,
                flags,
                length,
                cas,
                frames,
            },
        );
    }

    if items.is_empty() {
        return Ok(None);
    }

    Ok(Some(GetResult {
        items,
        frame: frame.clone(),
    }))
}

fn parse_field<T: std::str::FromStr>(field: &str, name: &str, header: &str) -> Result<T> {
    field.parse().map_err(|_| {
        MemcacheError::MalformedResponse(format!("invalid {} in VALUE header \"{}\"", name, header))
    })
}

// =============================================================================
// SET / DELETE
// =============================================================================

/// Parse a `set` response
pub fn parse_set(frame: &Frame) -> ResponseCode {
    if frame.as_bytes() == b"STORED\r\n" {
        return ResponseCode::Success;
    }

    match frame.first_line() {
        b"NOT_STORED" => ResponseCode::NotStored,
        b"EXISTS" => ResponseCode::DataExists,
        b"NOT_FOUND" => ResponseCode::NotFound,
        _ => ResponseCode::Failure,
    }
}

/// Parse a `delete` response
pub fn parse_delete(frame: &Frame) -> ResponseCode {
    match first_token(frame.first_line()) {
        b"DELETED" => ResponseCode::Success,
        b"NOT_FOUND" => ResponseCode::NotFound,
        _ => ResponseCode::Failure,
    }
}
