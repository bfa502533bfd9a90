//! Table settings.

use serde::{Deserialize, Serialize};

/// Settings handed to the poker engine when a game starts.
///
/// `max_players` is also the handshake's capacity limit: a client asking
/// for a seat at a full table is turned away with `ServerFull`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameData {
    /// Seats at the table.
    pub max_players: usize,
    /// Chips every player starts with.
    pub start_money: u32,
    /// Initial small blind; the big blind is twice this.
    pub small_blind: u32,
    /// Hands played before the blinds go up.
    pub hands_before_raise: u32,
}

impl GameData {
    pub fn big_blind(&self) -> u32 {
        self.small_blind * 2
    }
}

impl Default for GameData {
    fn default() -> Self {
        Self {
            max_players: 10,
            start_money: 3000,
            small_blind: 10,
            hands_before_raise: 8,
        }
    }
}
