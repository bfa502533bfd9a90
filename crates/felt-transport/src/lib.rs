//! Transport abstraction layer for felt.
//!
//! Provides the [`Connection`] trait and its two halves,
//! [`ConnectionReader`] and [`ConnectionWriter`]. The server core never
//! touches a socket type directly: it polls readers for readiness on its
//! own task and hands writers to the sender worker.
//!
//! # Feature Flags
//!
//! - `tcp` (default): plain TCP transport via `tokio::net`

mod error;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
#[cfg(feature = "tcp")]
pub use tcp::{TcpConnection, TcpReader, TcpTransport, TcpWriter};

use std::fmt;
use std::future::Future;
use std::io;

/// Opaque identifier for a connection.
///
/// Ordered so the session registry can iterate connections in a stable
/// order, the way a readiness set is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A freshly accepted connection, before it is split into halves.
///
/// Ownership moves exactly once: the acceptor produces it, the server
/// core splits it, keeps the reader and gives the writer to the sender.
pub trait Connection: Send + 'static {
    /// The receiving half.
    type Reader: ConnectionReader;
    /// The sending half.
    type Writer: ConnectionWriter;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Splits the connection into independently owned halves.
    fn into_split(self) -> (Self::Reader, Self::Writer);
}

/// The receiving half of a connection.
///
/// `Sync` is required because the poller borrows every reader at once
/// while waiting for the first to become readable.
pub trait ConnectionReader: Send + Sync + 'static {
    /// Waits until the connection is readable (data, EOF or error).
    ///
    /// May complete spuriously; the following [`try_read`](Self::try_read)
    /// then reports `WouldBlock`.
    fn readable(&self) -> impl Future<Output = io::Result<()>> + Send;

    /// Reads whatever is available without waiting.
    ///
    /// `Ok(0)` means the peer closed the connection.
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// The sending half of a connection.
pub trait ConnectionWriter: Send + 'static {
    /// Writes the whole buffer to the peer.
    fn write_all(
        &mut self,
        data: &[u8],
    ) -> impl Future<Output = io::Result<()>> + Send;

    /// Shuts down the write direction, signalling EOF to the peer.
    fn shutdown(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}
