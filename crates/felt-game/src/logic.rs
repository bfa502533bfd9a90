//! The `GameLogic` trait: the seam between the table server and the
//! poker engine.
//!
//! The server never looks inside a hand. It seats players, forwards
//! their game packets here, and delivers whatever comes back.

use felt_protocol::{PlayerId, Recipient};
use serde::{de::DeserializeOwned, Serialize};

use crate::{GameData, StartData};

/// What a player last did in the current hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerAction {
    #[default]
    None,
    Folded,
    Checked,
    Called,
    Raised,
    AllIn,
}

/// A player's place in a running game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub player_id: PlayerId,
    pub name: String,
    /// Seat number, as assigned during the handshake.
    pub seat: u32,
    /// Chips behind.
    pub cash: u32,
    /// Chips put in during the current betting round.
    pub stake: u32,
    pub action: PlayerAction,
    /// `false` once the player has left the table.
    pub active: bool,
}

impl Seat {
    /// Folds the seat out of the game for good. The seat keeps no chips:
    /// both `cash` and `stake` drop to zero.
    pub fn forfeit(&mut self) {
        self.action = PlayerAction::Folded;
        self.cash = 0;
        self.stake = 0;
        self.active = false;
    }
}

/// The trait the poker engine implements.
///
/// All methods are associated functions: the coordinator owns the state
/// and the seats and lends them out per call.
pub trait GameLogic: Send + Sync + 'static {
    /// The engine's own state for one game.
    type State: Send;

    /// What clients send inside `Packet::Game`.
    type ClientMessage: DeserializeOwned + Send;

    /// What the engine sends back inside `Packet::Game`.
    type ServerMessage: Serialize + Send;

    /// Creates the state for a new game.
    ///
    /// `seats` is in seat order and already funded with
    /// `config.start_money`.
    fn init(config: &GameData, seats: &[Seat], start: &StartData) -> Self::State;

    /// Processes one message from a seated player.
    fn handle_message(
        state: &mut Self::State,
        seats: &mut [Seat],
        sender: PlayerId,
        msg: Self::ClientMessage,
    ) -> Vec<(Recipient, Self::ServerMessage)>;

    /// Called after a player's seat was forfeited. Default: no-op.
    fn on_player_left(
        _state: &mut Self::State,
        _seats: &mut [Seat],
        _player: PlayerId,
    ) -> Vec<(Recipient, Self::ServerMessage)> {
        Vec::new()
    }
}
