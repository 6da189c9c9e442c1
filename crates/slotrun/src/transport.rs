//! # Transport Abstraction
//!
//! A minimal, async interface for moving bytes between a session and a server.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The Transport knows nothing about methods, keys or
//!   codecs. It moves opaque framed messages.
//! - **Request-Response**: The only interaction is "send bytes, await bytes".
//!   There are no one-way messages and no pipelining.
//! - **Reconnectable**: A `Connector` knows how to reach the peer and mints a
//!   fresh `Transport` for every connection, so a session can start over.

use std::fmt;

/// Errors that occur at the network/transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No connection could be established.
    Unreachable(String),
    /// The peer dropped an established connection.
    ConnectionLost(String),
    /// The operation timed out before it completed.
    Timeout,
    /// A frame exceeded the configured maximum length.
    PayloadTooLarge(usize),
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(msg) => write!(f, "Unreachable: {}", msg),
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Timeout => write!(f, "Timed out"),
            Self::PayloadTooLarge(len) => write!(f, "Frame of {} bytes too large for transport", len),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => Self::ConnectionLost(e.to_string()),
            std::io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A live connection that sends a byte buffer and receives the reply.
///
/// This trait is designed to be object-safe (`Box<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one request frame and waits for its reply frame.
    ///
    /// # invariants
    /// - Must return `Ok(vec)` with the raw reply bytes on success.
    /// - Must return `Err` if the exchange fails. Any `Err` leaves the
    ///   transport dead; sessions drop it and must reconnect.
    /// - Should not interpret the payload content.
    async fn call(&self, payload: &[u8]) -> Result<Vec<u8>>;
}

/// Knows how to reach a server.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a new connection. Each call yields an independent transport.
    async fn connect(&self) -> Result<Box<dyn Transport>>;

    /// Human-readable description of the peer, for logs.
    fn describe(&self) -> String;
}
