//! Unified error type for the felt server.

use std::io;

use felt_game::GameError;
use felt_protocol::ProtocolError;
use felt_session::SessionError;
use felt_transport::ConnectionId;

/// Top-level error that wraps all crate-specific errors.
///
/// Only [`ServerError::SelectFailed`] ends the server loop. Everything
/// else concerns a single connection and is reported through
/// [`ServerCallback::server_error`](crate::ServerCallback::server_error)
/// or handled in place.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Waiting for readable sockets failed. Fatal.
    #[error("readiness poll failed: {0}")]
    SelectFailed(#[source] io::Error),

    /// The sender worker couldn't write to a connection.
    #[error("send to {conn_id} failed: {source}")]
    SendFailed {
        conn_id: ConnectionId,
        #[source]
        source: io::Error,
    },

    /// The server loop has stopped and no longer takes input.
    #[error("server is not running")]
    Stopped,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Game(#[from] GameError),
}

impl ServerError {
    /// The OS error code behind this error, if there is one.
    pub fn os_error_code(&self) -> Option<i32> {
        match self {
            Self::SelectFailed(e) | Self::SendFailed { source: e, .. } => e.raw_os_error(),
            _ => None,
        }
    }

    /// Returns `true` for errors that stop the server loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SelectFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_failed_exposes_os_error_code() {
        let err = ServerError::SelectFailed(io::Error::from_raw_os_error(9));
        assert_eq!(err.os_error_code(), Some(9));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_send_failed_is_not_fatal() {
        let err = ServerError::SendFailed {
            conn_id: ConnectionId::new(3),
            source: io::Error::from(io::ErrorKind::BrokenPipe),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.os_error_code(), None);
        assert!(err.to_string().contains("conn-3"));
    }

    #[test]
    fn test_from_session_error() {
        let err: ServerError = SessionError::EmptyPlayerName.into();
        assert!(matches!(err, ServerError::Session(_)));
        assert_eq!(err.os_error_code(), None);
    }

    #[test]
    fn test_from_game_error() {
        let err: ServerError = GameError::NoActiveGame.into();
        assert!(matches!(err, ServerError::Game(_)));
        assert_eq!(err.to_string(), "no game is running");
    }
}
