//! Codec Tests
//!
//! Tests for request encoding and response framing.

use std::io::{BufReader, Cursor};

use memtext::config::DEFAULT_MAX_VALUE_SIZE;
use memtext::protocol::{
    encode_command, encode_named, read_frame, read_frame_with_limit, write_command, Command,
    CommandType, MAX_KEY_LENGTH,
};
use memtext::{Framing, MemcacheError, Value};

fn frame_of(input: &[u8], framing: Framing) -> Vec<u8> {
    let mut reader = Cursor::new(input.to_vec());
    read_frame(&mut reader, framing).unwrap().as_bytes().to_vec()
}

// =============================================================================
// Request Encoding Tests
// =============================================================================

#[test]
fn test_encode_set_string() {
    let cmd = Command::set("greeting", &Value::from("hello"), 0).unwrap();
    assert_eq!(encode_command(&cmd), b"set greeting 0 0 5\r\nhello\r\n");
}

#[test]
fn test_encode_set_integer_with_exptime() {
    let cmd = Command::set("counter", &Value::Integer(1234), 300).unwrap();
    assert_eq!(encode_command(&cmd), b"set counter 1 300 4\r\n1234\r\n");
}

#[test]
fn test_encode_set_float() {
    let cmd = Command::set("pi", &Value::Float(3.5), 0).unwrap();
    assert_eq!(encode_command(&cmd), b"set pi 2 0 3\r\n3.5\r\n");
}

#[test]
fn test_encode_set_boolean() {
    let cmd = Command::set("flag", &Value::Boolean(true), 0).unwrap();
    assert_eq!(encode_command(&cmd), b"set flag 3 0 1\r\n1\r\n");
}

#[test]
fn test_encode_set_empty_string() {
    let cmd = Command::set("empty", &Value::from(""), 0).unwrap();
    assert_eq!(encode_command(&cmd), b"set empty 0 0 0\r\n\r\n");
}

#[test]
fn test_encode_get() {
    let cmd = Command::get("mykey").unwrap();
    assert_eq!(encode_command(&cmd), b"get mykey\r\n");
}

#[test]
fn test_encode_delete() {
    let cmd = Command::delete("todelete").unwrap();
    assert_eq!(encode_command(&cmd), b"delete todelete\r\n");
}

#[test]
fn test_set_length_is_byte_length_for_multibyte_strings() {
    let value = "日本語テキスト";
    let cmd = Command::set("jp", &Value::from(value), 0).unwrap();
    let encoded = encode_command(&cmd);

    let header_end = encoded.windows(2).position(|w| w == b"\r\n").unwrap();
    let header = std::str::from_utf8(&encoded[..header_end]).unwrap();
    let declared: usize = header.split(' ').nth(4).unwrap().parse().unwrap();

    assert_eq!(declared, value.len());
    assert_ne!(declared, value.chars().count());
    assert_eq!(&encoded[header_end + 2..header_end + 2 + declared], value.as_bytes());
    assert_eq!(&encoded[header_end + 2 + declared..], b"\r\n");
}

#[test]
fn test_write_command_to_stream() {
    let mut out = Vec::new();
    write_command(&mut out, &Command::get("k").unwrap()).unwrap();
    assert_eq!(out, b"get k\r\n");
}

// =============================================================================
// Command Name Tests
// =============================================================================

#[test]
fn test_command_type_from_name() {
    assert_eq!("set".parse::<CommandType>().unwrap(), CommandType::Set);
    assert_eq!("get".parse::<CommandType>().unwrap(), CommandType::Get);
    assert_eq!("delete".parse::<CommandType>().unwrap(), CommandType::Delete);
}

#[test]
fn test_unsupported_command_names_rejected() {
    for name in ["stats", "flush_all", "add", "incr", "SET", ""] {
        let err = encode_named(name, "key", Some(&Value::from("v")), 0).unwrap_err();
        match err {
            MemcacheError::UnsupportedCommand(n) => assert_eq!(n, name),
            other => panic!("Expected UnsupportedCommand, got {:?}", other),
        }
    }
}

#[test]
fn test_unsupported_command_checked_before_key() {
    let err = encode_named("stats", "bad key", None, 0).unwrap_err();
    assert!(matches!(err, MemcacheError::UnsupportedCommand(_)));
}

#[test]
fn test_encode_named_supported() {
    assert_eq!(
        encode_named("set", "k", Some(&Value::Integer(7)), 10).unwrap(),
        b"set k 1 10 1\r\n7\r\n"
    );
    assert_eq!(encode_named("get", "k", None, 0).unwrap(), b"get k\r\n");
    assert_eq!(encode_named("delete", "k", None, 0).unwrap(), b"delete k\r\n");
}

#[test]
fn test_encode_named_set_without_value() {
    let err = encode_named("set", "k", None, 0).unwrap_err();
    assert!(matches!(err, MemcacheError::Serialization(_)));
}

// =============================================================================
// Key Validation Tests
// =============================================================================

#[test]
fn test_invalid_keys_rejected() {
    let too_long = "k".repeat(MAX_KEY_LENGTH + 1);
    for key in ["", "has space", "tab\there", "new\nline", "nul\0", too_long.as_str()] {
        let err = Command::get(key).unwrap_err();
        assert!(
            matches!(err, MemcacheError::InvalidKey(_)),
            "key {:?} should be rejected",
            key
        );
    }
}

#[test]
fn test_longest_key_accepted() {
    let key = "k".repeat(MAX_KEY_LENGTH);
    assert!(Command::delete(key).is_ok());
}

// =============================================================================
// Framing Tests (length-aware)
// =============================================================================

#[test]
fn test_frame_single_line_responses() {
    for line in [
        "STORED", "NOT_STORED", "EXISTS", "NOT_FOUND", "DELETED", "END", "ERROR", "OK", "RESET",
    ] {
        let input = format!("{}\r\n", line);
        assert_eq!(frame_of(input.as_bytes(), Framing::LengthAware), input.as_bytes());
    }
}

#[test]
fn test_frame_error_lines_with_message() {
    let input = b"CLIENT_ERROR bad data chunk\r\n";
    assert_eq!(frame_of(input, Framing::LengthAware), input);

    let input = b"SERVER_ERROR out of memory storing object\r\n";
    assert_eq!(frame_of(input, Framing::LengthAware), input);
}

#[test]
fn test_frame_stops_at_first_response() {
    let mut reader = Cursor::new(b"STORED\r\nDELETED\r\n".to_vec());
    let first = read_frame(&mut reader, Framing::LengthAware).unwrap();
    let second = read_frame(&mut reader, Framing::LengthAware).unwrap();
    assert_eq!(first.as_bytes(), b"STORED\r\n");
    assert_eq!(second.as_bytes(), b"DELETED\r\n");
}

#[test]
fn test_frame_value_response() {
    let input = b"VALUE k 0 5\r\nhello\r\nEND\r\n";
    assert_eq!(frame_of(input, Framing::LengthAware), input);
}

#[test]
fn test_frame_payload_containing_terminators() {
    let input = b"VALUE k 0 18\r\nEND\r\nSTORED\r\nERROR\r\nEND\r\n";
    assert_eq!(frame_of(input, Framing::LengthAware), input);
}

#[test]
fn test_frame_zero_length_value() {
    let input = b"VALUE k 0 0\r\n\r\nEND\r\n";
    assert_eq!(frame_of(input, Framing::LengthAware), input);
}

#[test]
fn test_frame_small_chunks() {
    let input = b"VALUE key 0 26\r\nabcdefghijklmnopqrstuvwxyz\r\nEND\r\n".to_vec();
    let mut reader = BufReader::with_capacity(3, Cursor::new(input.clone()));
    let frame = read_frame(&mut reader, Framing::LengthAware).unwrap();
    assert_eq!(frame.as_bytes(), &input[..]);
}

#[test]
fn test_frame_lowercase_terminator() {
    assert_eq!(frame_of(b"stored\r\n", Framing::LengthAware), b"stored\r\n");
}

#[test]
fn test_frame_lowercase_value_header() {
    let input = b"value k 0 5\r\nEND\r\n\r\nEND\r\n";
    assert_eq!(frame_of(input, Framing::LengthAware), input);
}

#[test]
fn test_frame_eof_before_terminator() {
    let mut reader = Cursor::new(b"VALUE k 0 5\r\nhel".to_vec());
    let err = read_frame(&mut reader, Framing::LengthAware).unwrap_err();
    match err {
        MemcacheError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("Expected Io error, got {:?}", other),
    }
}

#[test]
fn test_frame_empty_stream() {
    let mut reader = Cursor::new(Vec::new());
    let err = read_frame(&mut reader, Framing::LengthAware).unwrap_err();
    assert!(matches!(err, MemcacheError::Io(_)));
}

#[test]
fn test_frame_payload_without_crlf() {
    let mut reader = Cursor::new(b"VALUE k 0 2\r\nabcdEND\r\n".to_vec());
    let err = read_frame(&mut reader, Framing::LengthAware).unwrap_err();
    assert!(matches!(err, MemcacheError::MalformedResponse(_)));
}

// =============================================================================
// Framing Tests (value size limit)
// =============================================================================

fn value_response(length: usize) -> Vec<u8> {
    let mut input = format!("VALUE k 0 {}\r\n", length).into_bytes();
    input.resize(input.len() + length, b'v');
    input.extend_from_slice(b"\r\nEND\r\n");
    input
}

#[test]
fn test_frame_rejects_overflowing_length() {
    let mut reader = Cursor::new(b"VALUE k 0 18446744073709551615\r\nx\r\nEND\r\n".to_vec());
    let err = read_frame(&mut reader, Framing::LengthAware).unwrap_err();
    assert!(matches!(err, MemcacheError::MalformedResponse(_)));
}

#[test]
fn test_frame_rejects_huge_length_without_allocating() {
    // 2^40 bytes
    let mut reader = Cursor::new(b"VALUE k 0 1099511627776\r\nx\r\nEND\r\n".to_vec());
    let err = read_frame(&mut reader, Framing::LengthAware).unwrap_err();
    match err {
        MemcacheError::MalformedResponse(msg) => assert!(msg.contains("limit")),
        other => panic!("Expected MalformedResponse, got {:?}", other),
    }
}

#[test]
fn test_frame_rejects_unparseable_length() {
    for input in [
        &b"VALUE k 0 99999999999999999999999\r\nx\r\nEND\r\n"[..],
        b"VALUE k 0 -1\r\nx\r\nEND\r\n",
        b"VALUE k 0\r\nx\r\nEND\r\n",
    ] {
        let mut reader = Cursor::new(input.to_vec());
        let err = read_frame(&mut reader, Framing::LengthAware).unwrap_err();
        assert!(matches!(err, MemcacheError::MalformedResponse(_)), "{:?}", input);
    }
}

#[test]
fn test_frame_default_limit() {
    let input = value_response(DEFAULT_MAX_VALUE_SIZE);
    assert_eq!(frame_of(&input, Framing::LengthAware), input);

    let mut reader = Cursor::new(value_response(DEFAULT_MAX_VALUE_SIZE + 1));
    let err = read_frame(&mut reader, Framing::LengthAware).unwrap_err();
    assert!(matches!(err, MemcacheError::MalformedResponse(_)));
}

#[test]
fn test_frame_custom_limit() {
    let input = value_response(10);

    let mut reader = Cursor::new(input.clone());
    let frame = read_frame_with_limit(&mut reader, Framing::LengthAware, 10).unwrap();
    assert_eq!(frame.as_bytes(), &input[..]);

    let mut reader = Cursor::new(input);
    let err = read_frame_with_limit(&mut reader, Framing::LengthAware, 9).unwrap_err();
    assert!(matches!(err, MemcacheError::MalformedResponse(_)));
}

// =============================================================================
// Framing Tests (terminator scan)
// =============================================================================

#[test]
fn test_scan_frame_plain_value() {
    let input = b"VALUE k 0 5\r\nhello\r\nEND\r\n";
    assert_eq!(frame_of(input, Framing::TerminatorScan), input);
}

#[test]
fn test_scan_frame_stops_inside_payload() {
    let input = b"VALUE k 0 18\r\nEND\r\nSTORED\r\nERROR\r\nEND\r\n";
    assert_eq!(frame_of(input, Framing::TerminatorScan), b"VALUE k 0 18\r\nEND\r\n");
}

#[test]
fn test_scan_frame_prefix_match() {
    let input = b"VALUE k 0 6\r\nENDING\r\nEND\r\n";
    assert_eq!(frame_of(input, Framing::TerminatorScan), b"VALUE k 0 6\r\nENDING\r\n");
}
