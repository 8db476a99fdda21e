//! RESP Reply Types
//!
//! Every reply the server sends is one of five RESP frames. Requests travel
//! the other way as arrays of bulk strings and are handled by the parser.
//!
//! ## Wire Format
//!
//! - Simple String: `+OK\r\n`
//! - Error: `-ERR unknown command 'FOO'\r\n`
//! - Integer: `:1\r\n`
//! - Bulk String: `$12\r\n1.google.com\r\n`
//! - Null Bulk String: `$-1\r\n`

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A reply frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status reply. Must not contain CR or LF.
    SimpleString(String),

    /// Error reply. Must not contain CR or LF.
    Error(String),

    /// 64-bit signed integer.
    Integer(i64),

    /// Binary-safe string.
    BulkString(Bytes),

    /// Null bulk string, the "not found" reply.
    Null,
}

impl Reply {
    /// Creates an error reply.
    ///
    /// CR and LF are replaced with spaces so the frame stays on one line.
    ///
    /// # Example
    /// ```
    /// use rdnscache::protocol::Reply;
    /// let err = Reply::error("ERR unknown command 'FOO'");
    /// assert_eq!(err.serialize(), b"-ERR unknown command 'FOO'\r\n");
    /// ```
    pub fn error(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.contains(['\r', '\n']) {
            Reply::Error(s.replace(['\r', '\n'], " "))
        } else {
            Reply::Error(s)
        }
    }

    pub fn integer(n: i64) -> Self {
        Reply::Integer(n)
    }

    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        Reply::BulkString(data.into())
    }

    pub fn null() -> Self {
        Reply::Null
    }

    /// Common reply for successful operations
    pub fn ok() -> Self {
        Reply::SimpleString("OK".to_string())
    }

    /// Reply to PING
    pub fn pong() -> Self {
        Reply::SimpleString("PONG".to_string())
    }

    /// Serializes the reply to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Reply::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::SimpleString(s) => write!(f, "{}", s),
            Reply::Error(s) => write!(f, "(error) {}", s),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            Reply::Null => write!(f, "(nil)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        assert_eq!(Reply::ok().serialize(), b"+OK\r\n");
        assert_eq!(Reply::pong().serialize(), b"+PONG\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = Reply::error("ERR unknown command 'FOO'");
        assert_eq!(value.serialize(), b"-ERR unknown command 'FOO'\r\n");
    }

    #[test]
    fn test_error_strips_line_breaks() {
        let value = Reply::error("ERR bad\r\nthing");
        assert_eq!(value.serialize(), b"-ERR bad  thing\r\n");
    }

    #[test]
    fn test_integer_serialize() {
        assert_eq!(Reply::integer(1).serialize(), b":1\r\n");
        assert_eq!(Reply::integer(0).serialize(), b":0\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = Reply::bulk_string("1.google.com,2.google.com");
        assert_eq!(value.serialize(), b"$25\r\n1.google.com,2.google.com\r\n");
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(Reply::null().serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_display() {
        assert_eq!(Reply::null().to_string(), "(nil)");
        assert_eq!(Reply::integer(1).to_string(), "(integer) 1");
        assert_eq!(Reply::bulk_string("a.net").to_string(), "\"a.net\"");
    }
}
