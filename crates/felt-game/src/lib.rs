//! Game-side state for a felt table.
//!
//! The session layer knows who is sitting at the table; this crate knows
//! what happens once the host deals the first hand.
//!
//! # Key types
//!
//! - [`GameData`]: table settings (seats, buy-in, blinds)
//! - [`StartData`]: player count and dealer, drawn at game start
//! - [`GameLogic`]: the trait the poker engine implements
//! - [`GameCoordinator`]: owns the one running [`Game`]
//! - [`Seat`]: a player's place in a running game

mod config;
mod coordinator;
mod error;
mod logic;
mod start;

pub use config::GameData;
pub use coordinator::{Game, GameCoordinator, GameOutbound};
pub use error::GameError;
pub use logic::{GameLogic, PlayerAction, Seat};
pub use start::StartData;
