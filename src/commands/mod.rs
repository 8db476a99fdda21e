//! Command Handler Module
//!
//! This module implements the command processing layer. It receives the
//! arguments of a parsed RESP request, executes them against the reverse-DNS
//! cache, and returns the reply frame.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Validate     │
//! │  - Dispatch     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ ReverseDnsCache │  (resolver module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! `PING`, `QUIT`, `SET`, `GET`, `DEL`

pub mod command;
pub mod handler;

pub use command::{Command, CommandError};
pub use handler::{CommandHandler, Flow, DEFAULT_OBSERVED_TTL};
