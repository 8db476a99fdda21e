//! RESP Protocol Implementation
//!
//! The subset of the Redis Serialization Protocol (RESP) the cache speaks:
//! requests are arrays of bulk strings (or inline lines), replies are simple
//! strings, errors, integers, bulk strings and nulls. That is enough for any
//! stock Redis client to talk to the server unmodified.
//!
//! ## Modules
//!
//! - `types`: the [`Reply`] enum and its serialization
//! - `parser`: incremental request parsing
//!
//! ## Example
//!
//! ```
//! use rdnscache::protocol::{parse_request, Reply};
//!
//! let (args, _) = parse_request(b"*1\r\n$4\r\nPING\r\n").unwrap().unwrap();
//! assert_eq!(args, vec!["PING"]);
//!
//! assert_eq!(Reply::pong().serialize(), b"+PONG\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_request, ParseError, ParseResult};
pub use types::Reply;
