//! Error types for the game layer.

use felt_protocol::{PlayerId, ProtocolError};

/// Errors that can occur while starting or running a game.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// A game can't start without players.
    #[error("cannot start a game with an empty roster")]
    EmptyRoster,

    /// The drawn dealer ordinal matched nobody in the roster.
    #[error("no player at dealer ordinal {ordinal} of {count}")]
    DealerNotSeated { ordinal: usize, count: usize },

    /// Game traffic arrived while no game is running.
    #[error("no game is running")]
    NoActiveGame,

    /// The sender has no seat in the running game.
    #[error("player {0} is not seated in the running game")]
    NotSeated(PlayerId),

    /// The game payload couldn't be decoded or encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
