//! Command Handler
//!
//! Receives the arguments of one request, turns them into a [`Command`],
//! runs it against the [`ReverseDnsCache`] and produces the reply.
//!
//! ## Supported Commands
//!
//! - `PING` - liveness check
//! - `QUIT` - reply `OK`, then close the connection
//! - `SET ip value` - observe the hostname before the first `;` of `value`
//! - `GET ip` - sorted, comma-joined hostnames, or null
//! - `DEL ip` - drop everything known about `ip`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ from_args() │───>│  dispatch() │───>│  cmd_*()    │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ReverseDnsCache        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::commands::command::Command;
use crate::protocol::Reply;
use crate::resolver::ReverseDnsCache;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// TTL recorded for hostnames observed through SET.
pub const DEFAULT_OBSERVED_TTL: u64 = 3;

/// What the connection should do after sending a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Executes commands against the shared cache.
///
/// Cloning is cheap; every connection gets its own clone.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    resolver: Arc<ReverseDnsCache>,
    default_ttl: u64,
}

impl CommandHandler {
    /// Creates a handler that records SET observations with `default_ttl`.
    pub fn new(resolver: Arc<ReverseDnsCache>, default_ttl: u64) -> Self {
        Self {
            resolver,
            default_ttl,
        }
    }

    /// Executes one request and returns the reply.
    ///
    /// Malformed requests produce an error reply; they never end the
    /// connection. Only `QUIT` returns [`Flow::Close`].
    pub fn execute(&self, args: Vec<Bytes>) -> (Reply, Flow) {
        match Command::from_args(args) {
            Ok(command) => self.dispatch(command),
            Err(e) => {
                debug!(error = %e, "Rejected command");
                (Reply::error(e.to_string()), Flow::Continue)
            }
        }
    }

    /// Dispatches a command to its handler.
    fn dispatch(&self, command: Command) -> (Reply, Flow) {
        match command {
            Command::Ping => (Reply::pong(), Flow::Continue),
            Command::Quit => (Reply::ok(), Flow::Close),
            Command::Set { ip, hostname } => (self.cmd_set(&ip, &hostname), Flow::Continue),
            Command::Get { ip } => (self.cmd_get(&ip), Flow::Continue),
            Command::Del { ip } => (self.cmd_del(&ip), Flow::Continue),
        }
    }

    /// SET ip value
    fn cmd_set(&self, ip: &str, hostname: &str) -> Reply {
        match self.resolver.observe(ip, hostname, self.default_ttl) {
            Ok(()) => Reply::ok(),
            Err(e) => {
                warn!(key = %ip, error = %e, "SET failed");
                Reply::error(format!("ERR {}", e))
            }
        }
    }

    /// GET ip
    fn cmd_get(&self, ip: &str) -> Reply {
        match self.resolver.lookup(ip) {
            Some(hostnames) => Reply::bulk_string(hostnames),
            None => Reply::null(),
        }
    }

    /// DEL ip
    fn cmd_del(&self, ip: &str) -> Reply {
        if self.resolver.forget(ip) {
            Reply::integer(1)
        } else {
            Reply::integer(0)
        }
    }
}
