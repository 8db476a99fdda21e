//! Per-client connection loop.
//!
//! Each accepted socket gets one [`ConnectionHandler`] running on its own
//! task. The loop answers every complete request already buffered, flushes
//! the replies, and only then reads again, so pipelined requests are
//! answered in order with one write per batch.
//!
//! The loop ends when the client sends `QUIT`, closes its side, or sends
//! bytes that are not valid RESP framing. In the last case the client gets
//! one `-ERR Protocol error` reply first.
//!
//! Bytes accumulate in a `BytesMut`: a single read may hold half a request
//! or several of them.

use crate::commands::{CommandHandler, Flow};
use crate::protocol::{parse_request, ParseError, Reply};
use bytes::{Buf, Bytes, BytesMut};
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, trace, warn};

/// Maximum size for the read buffer (4 MB)
const MAX_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Server-wide connection counters, shared by every handler.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    accepted: AtomicU64,
    active: AtomicU64,
    commands: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
}

/// Point-in-time copy of [`ConnectionStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub accepted: u64,
    pub active: u64,
    pub commands: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

impl fmt::Display for ConnectionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accepted={} active={} commands={} read={}B written={}B",
            self.accepted, self.active, self.commands, self.bytes_read, self.bytes_written
        )
    }
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }

    fn opened(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    fn closed(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    fn record_command(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    fn record_read(&self, n: usize) {
        self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
    }

    fn record_written(&self, n: usize) {
        self.bytes_written.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the stream so the same loop serves TCP sockets and the
/// in-memory streams used in tests.
pub struct ConnectionHandler<S> {
    /// Replies are queued here and flushed before each read
    stream: BufWriter<S>,
    addr: SocketAddr,
    /// Unparsed request bytes
    buffer: BytesMut,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an accepted stream. Counts as an open connection until
    /// [`run`](Self::run) returns.
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            stats,
        }
    }

    /// Runs the main connection loop.
    ///
    /// Reads requests from the client, executes them, and sends back replies
    /// until the client quits, disconnects, or breaks the framing.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client quit"),
            Err(e) if e.is_disconnect() => {
                debug!(client = %self.addr, error = %e, "Client went away")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(args) = self.try_parse_request().await? {
                if args.is_empty() {
                    continue;
                }

                let (reply, flow) = self.command_handler.execute(args);
                self.stats.record_command();
                self.send_response(&reply).await?;

                if flow == Flow::Close {
                    self.stream.shutdown().await?;
                    return Ok(());
                }
            }

            // Everything buffered has been answered.
            self.stream.flush().await?;

            self.read_more_data().await?;
        }
    }

    /// Attempts to parse a request from the buffer.
    ///
    /// On a framing error the client gets one error reply before the
    /// connection is dropped.
    async fn try_parse_request(&mut self) -> Result<Option<Vec<Bytes>>, ConnectionError> {
        match parse_request(&self.buffer) {
            Ok(Some((args, consumed))) => {
                self.buffer.advance(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed request"
                );
                Ok(Some(args))
            }
            Ok(None) => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete request, need more data"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Parse error");
                let reply = Reply::error(format!("ERR Protocol error: {}", e));
                self.send_response(&reply).await?;
                self.stream.flush().await?;
                Err(ConnectionError::ParseError(e))
            }
        }
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            return Err(if self.buffer.is_empty() {
                ConnectionError::ClientDisconnected
            } else {
                ConnectionError::UnexpectedEof
            });
        }

        self.stats.record_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Queues a reply. It goes out on the next flush.
    async fn send_response(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        self.stream.write_all(&bytes).await?;
        self.stats.record_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Queued reply"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// RESP framing error
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    /// Peer closed between requests
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Peer closed mid-request
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    #[error("Buffer size limit exceeded")]
    BufferFull,
}

impl ConnectionError {
    /// True when the peer simply went away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ConnectionError::ClientDisconnected => true,
            ConnectionError::IoError(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// Runs a [`ConnectionHandler`] to completion. The outcome has already been
/// logged by [`ConnectionHandler::run`].
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let _ = ConnectionHandler::new(stream, addr, command_handler, stats)
        .run()
        .await;
}
