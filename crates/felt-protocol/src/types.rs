//! Core protocol types: identifiers, recipients, error codes and packets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol version a client must announce in its [`Packet::Init`].
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Player ids are handed out by the server in join order and are never
/// reused, so they are NOT contiguous and say nothing about seating.
/// Seat order lives in the player's seat number instead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifier of one client session on the server.
///
/// Sessions rejected before their handshake carry `SessionId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive an outbound message produced by game logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every seated player.
    All,
    /// One specific player.
    Player(PlayerId),
    /// Every seated player except one.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Errors reported to a client right before the server closes its session.
///
/// A client receives at most one of these; the connection is released a
/// grace period later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The game already started; late joiners are turned away.
    GameAlreadyRunning,
    /// The host removed this player from the table.
    PlayerKicked,
    /// The password in the handshake doesn't match the server's.
    InvalidPassword,
    /// Another connected player already uses this name.
    PlayerNameInUse,
    /// The requested player name is empty.
    InvalidPlayerName,
    /// Every seat is taken.
    ServerFull,
    /// The client speaks a different protocol version.
    VersionNotSupported,
    /// The client sent something that couldn't be decoded, or sent a
    /// packet that isn't valid in its current state.
    InvalidPacket,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GameAlreadyRunning => "game already running",
            Self::PlayerKicked => "player kicked",
            Self::InvalidPassword => "invalid password",
            Self::PlayerNameInUse => "player name in use",
            Self::InvalidPlayerName => "invalid player name",
            Self::ServerFull => "server full",
            Self::VersionNotSupported => "version not supported",
            Self::InvalidPacket => "invalid packet",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// Every message exchanged between a table server and its clients.
///
/// `Clone` is part of the contract: a broadcast to N sessions hands N
/// independent copies to the sender.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
/// `{ "type": "PlayerLeft", "player_id": 3 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Packet {
    /// Client → Server: first packet of every session.
    Init {
        version: u32,
        password: String,
        player_name: String,
    },

    /// Server → Client: handshake accepted.
    InitAck {
        session_id: SessionId,
        player_id: PlayerId,
        seat: u32,
    },

    /// Server → Client: a player is now seated at the table.
    PlayerJoined {
        player_id: PlayerId,
        player_name: String,
        seat: u32,
    },

    /// Server → Client: a player left or was removed.
    PlayerLeft { player_id: PlayerId },

    /// Server → Client: the hand is starting with these players.
    GameStart {
        game_id: u32,
        dealer: PlayerId,
        players: Vec<PlayerId>,
    },

    /// Either direction: game data, opaque to the session layer.
    Game { data: Vec<u8> },

    /// Server → Client: the session is about to be closed.
    Error { code: ErrorCode },
}

impl Packet {
    /// Short name of the packet kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "Init",
            Self::InitAck { .. } => "InitAck",
            Self::PlayerJoined { .. } => "PlayerJoined",
            Self::PlayerLeft { .. } => "PlayerLeft",
            Self::GameStart { .. } => "GameStart",
            Self::Game { .. } => "Game",
            Self::Error { .. } => "Error",
        }
    }
}

#[cfg(test)]
mod tests {
    //! The JSON shapes here are what clients parse; these tests pin them.

    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(3).to_string(), "S-3");
    }

    #[test]
    fn test_init_packet_json_format() {
        let packet = Packet::Init {
            version: PROTOCOL_VERSION,
            password: "secret".into(),
            player_name: "alice".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&packet).unwrap();

        assert_eq!(json["type"], "Init");
        assert_eq!(json["version"], 1);
        assert_eq!(json["password"], "secret");
        assert_eq!(json["player_name"], "alice");
    }

    #[test]
    fn test_error_packet_carries_code_name() {
        let packet = Packet::Error {
            code: ErrorCode::GameAlreadyRunning,
        };
        let json: serde_json::Value = serde_json::to_value(&packet).unwrap();

        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], "GameAlreadyRunning");
    }

    #[test]
    fn test_game_start_lists_player_ids() {
        let packet = Packet::GameStart {
            game_id: 1,
            dealer: PlayerId(5),
            players: vec![PlayerId(2), PlayerId(5)],
        };
        let json: serde_json::Value = serde_json::to_value(&packet).unwrap();

        assert_eq!(json["dealer"], 5);
        assert_eq!(json["players"], serde_json::json!([2, 5]));
    }

    #[test]
    fn test_packet_kind_names() {
        assert_eq!(Packet::Game { data: vec![] }.kind(), "Game");
        assert_eq!(
            Packet::PlayerLeft {
                player_id: PlayerId(1)
            }
            .kind(),
            "PlayerLeft"
        );
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::PlayerKicked.to_string(), "player kicked");
        assert_eq!(ErrorCode::ServerFull.to_string(), "server full");
    }
}
