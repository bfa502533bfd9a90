//! TCP transport implementation using `tokio::net`.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use crate::{
    Connection, ConnectionId, ConnectionReader, ConnectionWriter,
    TransportError,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Accepts TCP connections and wraps them as [`TcpConnection`]s.
///
/// This is the acceptor that feeds the server's connection queue; it
/// knows nothing about sessions.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for and accepts the next incoming connection.
    pub async fn accept(&self) -> Result<TcpConnection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%addr, error = %e, "could not disable Nagle");
        }

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "accepted TCP connection");

        Ok(TcpConnection { id, stream })
    }
}

/// A single accepted TCP connection.
#[derive(Debug)]
pub struct TcpConnection {
    id: ConnectionId,
    stream: TcpStream,
}

impl Connection for TcpConnection {
    type Reader = TcpReader;
    type Writer = TcpWriter;

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn into_split(self) -> (TcpReader, TcpWriter) {
        let (read, write) = self.stream.into_split();
        (TcpReader { inner: read }, TcpWriter { inner: write })
    }
}

/// Receiving half of a [`TcpConnection`].
#[derive(Debug)]
pub struct TcpReader {
    inner: OwnedReadHalf,
}

impl ConnectionReader for TcpReader {
    async fn readable(&self) -> io::Result<()> {
        self.inner.readable().await
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.try_read(buf)
    }
}

/// Sending half of a [`TcpConnection`].
#[derive(Debug)]
pub struct TcpWriter {
    inner: OwnedWriteHalf,
}

impl ConnectionWriter for TcpWriter {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data).await
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}
