//! Error types for the session layer.

use felt_transport::ConnectionId;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A session for this connection handle is already registered.
    /// Internal only; the offending connection is dropped without a reply.
    #[error("a session for {0} already exists")]
    DuplicateConnection(ConnectionId),

    /// Player data must carry a name before it can be attached.
    #[error("player name must not be empty")]
    EmptyPlayerName,

    /// The session already has a player; player data is attached once.
    #[error("{0} already has a player attached")]
    PlayerAlreadyAttached(ConnectionId),

    /// The handshake credentials were rejected by the
    /// [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),
}
