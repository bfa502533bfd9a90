//! Session types: what the server knows about one connection.
//!
//! A session is split in two parts:
//! - [`SessionData`]: the connection side, created on accept.
//! - [`PlayerData`]: the identity side, attached once the handshake
//!   succeeds.
//!
//! [`SessionWrapper`] pairs them. A wrapper without player data belongs
//! to a client that hasn't finished logging in.

use felt_protocol::{PlayerId, SessionId};
use felt_transport::ConnectionId;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle state of a session's connection.
///
/// ```text
///   Connecting ──(handshake ok)──→ Established
///       │                               │
///       └────────(deferred close)───────┴──→ Closing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, handshake not yet completed.
    Connecting,
    /// Handshake completed, player data attached.
    Established,
    /// Removed from the registry, waiting for release.
    Closing,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Established => write!(f, "Established"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionData
// ---------------------------------------------------------------------------

/// The connection side of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    /// Connection handle; the registry key.
    pub conn_id: ConnectionId,
    /// Server-assigned session number.
    pub session_id: SessionId,
    /// Current lifecycle state.
    pub state: SessionState,
}

impl SessionData {
    /// Creates a session in the `Connecting` state.
    pub fn new(conn_id: ConnectionId, session_id: SessionId) -> Self {
        Self {
            conn_id,
            session_id,
            state: SessionState::Connecting,
        }
    }

    /// Returns `true` once the handshake has completed.
    pub fn is_established(&self) -> bool {
        self.state == SessionState::Established
    }
}

// ---------------------------------------------------------------------------
// PlayerData
// ---------------------------------------------------------------------------

/// The identity side of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerData {
    /// Globally unique player id. Not related to seat order.
    pub id: PlayerId,
    /// Display name, unique among established sessions.
    pub name: String,
    /// Seat number at the table, starting at 0.
    pub seat: u32,
}

impl PlayerData {
    pub fn new(id: PlayerId, name: impl Into<String>, seat: u32) -> Self {
        Self {
            id,
            name: name.into(),
            seat,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionWrapper
// ---------------------------------------------------------------------------

/// A session together with its player, if the handshake has attached one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionWrapper {
    pub session: SessionData,
    pub player: Option<PlayerData>,
}

impl SessionWrapper {
    /// Wraps a session that has no player yet.
    pub fn new(session: SessionData) -> Self {
        Self {
            session,
            player: None,
        }
    }

    /// Shortcut for the connection handle.
    pub fn conn_id(&self) -> ConnectionId {
        self.session.conn_id
    }

    /// The attached player's name, if it has one.
    pub fn player_name(&self) -> Option<&str> {
        self.player
            .as_ref()
            .map(|p| p.name.as_str())
            .filter(|name| !name.is_empty())
    }
}
