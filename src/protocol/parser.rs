//! Incremental RESP Request Parser
//!
//! Clients send each command as an array of bulk strings:
//!
//! ```text
//! *3\r\n$3\r\nSET\r\n$7\r\n8.8.8.4\r\n$15\r\n1.google.com;22\r\n
//! ```
//!
//! or, when typed into telnet, as a single whitespace-separated "inline"
//! line ending in `\n` or `\r\n`.
//!
//! ## How the Parser Works
//!
//! [`parse_request`] looks at the front of a buffer and returns either:
//! - `Ok(Some((args, consumed)))` - one complete request; `consumed` bytes
//!   may be dropped from the buffer
//! - `Ok(None)` - the request is incomplete, read more and retry
//! - `Err(ParseError)` - the stream is malformed and cannot be resynchronised
//!
//! An empty `args` vector means an empty request (`*0\r\n` or a blank line),
//! which the connection skips without replying.

use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while parsing a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A length prefix was not a valid integer
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Bulk string length is negative
    #[error("invalid bulk length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative or too large
    #[error("invalid multibulk length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (wrong type prefix, missing CRLF, etc.)
    #[error("{0}")]
    ProtocolError(String),

    /// The request exceeds maximum allowed size
    #[error("request too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size of a single bulk string argument (1 MB)
pub const MAX_BULK_SIZE: usize = 1024 * 1024;

/// Maximum number of arguments in one request
pub const MAX_ARGS: i64 = 1024;

/// Maximum length of an inline request line (64 KB)
pub const MAX_INLINE_SIZE: usize = 64 * 1024;

/// Parses one request from the front of `buf`.
///
/// # Example
///
/// ```
/// use rdnscache::protocol::parse_request;
///
/// let (args, consumed) = parse_request(b"*2\r\n$3\r\nGET\r\n$7\r\n8.8.8.8\r\n")
///     .unwrap()
///     .unwrap();
/// assert_eq!(args, vec!["GET", "8.8.8.8"]);
/// assert_eq!(consumed, 26);
/// ```
pub fn parse_request(buf: &[u8]) -> ParseResult<Option<(Vec<Bytes>, usize)>> {
    match buf.first() {
        None => Ok(None),
        Some(&prefix::ARRAY) => parse_array(buf),
        Some(_) => parse_inline(buf),
    }
}

/// Reads a `<prefix><integer>\r\n` header line.
///
/// Returns the integer and the number of bytes the line occupied.
fn parse_header(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    let end = match find_crlf(&buf[1..]) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let raw = &buf[1..1 + end];
    let text = std::str::from_utf8(raw)
        .map_err(|_| ParseError::InvalidInteger(String::from_utf8_lossy(raw).into_owned()))?;
    let n = text
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidInteger(text.to_string()))?;

    Ok(Some((n, 1 + end + 2)))
}

/// Parses `*<count>\r\n` followed by `count` bulk strings.
fn parse_array(buf: &[u8]) -> ParseResult<Option<(Vec<Bytes>, usize)>> {
    let (count, mut consumed) = match parse_header(buf)? {
        Some(header) => header,
        None => return Ok(None),
    };

    if count <= 0 {
        return Ok(Some((Vec::new(), consumed)));
    }
    if count > MAX_ARGS {
        return Err(ParseError::InvalidArrayLength(count));
    }

    let mut args = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match parse_bulk(&buf[consumed..])? {
            Some((arg, used)) => {
                args.push(arg);
                consumed += used;
            }
            None => return Ok(None),
        }
    }

    Ok(Some((args, consumed)))
}

/// Parses `$<length>\r\n<data>\r\n`.
fn parse_bulk(buf: &[u8]) -> ParseResult<Option<(Bytes, usize)>> {
    match buf.first() {
        None => return Ok(None),
        Some(&prefix::BULK_STRING) => {}
        Some(&other) => {
            return Err(ParseError::ProtocolError(format!(
                "expected '$', got '{}'",
                other.escape_ascii()
            )))
        }
    }

    let (length, data_start) = match parse_header(buf)? {
        Some(header) => header,
        None => return Ok(None),
    };

    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let total_needed = data_start + length + 2;
    if buf.len() < total_needed {
        return Ok(None);
    }

    if &buf[data_start + length..total_needed] != CRLF {
        return Err(ParseError::ProtocolError(
            "bulk string missing trailing CRLF".to_string(),
        ));
    }

    let data = Bytes::copy_from_slice(&buf[data_start..data_start + length]);
    Ok(Some((data, total_needed)))
}

/// Parses a whitespace-separated line terminated by `\n` or `\r\n`.
fn parse_inline(buf: &[u8]) -> ParseResult<Option<(Vec<Bytes>, usize)>> {
    let newline = match buf.iter().position(|&b| b == b'\n') {
        Some(pos) => pos,
        None if buf.len() > MAX_INLINE_SIZE => {
            return Err(ParseError::MessageTooLarge {
                size: buf.len(),
                max: MAX_INLINE_SIZE,
            })
        }
        None => return Ok(None),
    };

    let line = buf[..newline].strip_suffix(b"\r").unwrap_or(&buf[..newline]);

    let args = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|part| !part.is_empty())
        .map(Bytes::copy_from_slice)
        .collect();

    Ok(Some((args, newline + 1)))
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
