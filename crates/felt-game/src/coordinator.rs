//! Ownership of the running game.
//!
//! A table runs at most one game. The [`GameCoordinator`] holds it from
//! the moment the host starts until the server shuts down, and is the
//! only way the server core touches game state.

use felt_protocol::{Codec, JsonCodec, PlayerId, Recipient};
use felt_session::PlayerData;

use crate::{GameData, GameError, GameLogic, PlayerAction, Seat, StartData};

/// Outbound game payloads, already encoded.
pub type GameOutbound = Vec<(Recipient, Vec<u8>)>;

/// One running game.
pub struct Game<G: GameLogic> {
    pub id: u32,
    pub start: StartData,
    pub seats: Vec<Seat>,
    pub state: G::State,
}

impl<G: GameLogic> Game<G> {
    /// Looks up a player's seat.
    pub fn seat(&self, player: PlayerId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.player_id == player)
    }

    /// Player ids in seat order.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.seats.iter().map(|s| s.player_id).collect()
    }
}

impl<G: GameLogic> std::fmt::Debug for Game<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("id", &self.id)
            .field("start", &self.start)
            .field("seats", &self.seats)
            .finish_non_exhaustive()
    }
}

/// Owns the active game, if any.
pub struct GameCoordinator<G: GameLogic> {
    config: GameData,
    codec: JsonCodec,
    active: Option<Game<G>>,
    next_game_id: u32,
}

impl<G: GameLogic> GameCoordinator<G> {
    pub fn new(config: GameData) -> Self {
        Self {
            config,
            codec: JsonCodec,
            active: None,
            next_game_id: 1,
        }
    }

    pub fn config(&self) -> &GameData {
        &self.config
    }

    /// The running game, if one was started.
    pub fn active(&self) -> Option<&Game<G>> {
        self.active.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Seats `roster` and starts a new game.
    ///
    /// Every seat gets `start_money` chips. Game ids count up from 1 and
    /// are never reused.
    pub fn start(&mut self, roster: &[PlayerData], start: StartData) -> &Game<G> {
        let seats: Vec<Seat> = roster
            .iter()
            .map(|player| Seat {
                player_id: player.id,
                name: player.name.clone(),
                seat: player.seat,
                cash: self.config.start_money,
                stake: 0,
                action: PlayerAction::None,
                active: true,
            })
            .collect();

        let id = self.next_game_id;
        self.next_game_id += 1;
        let state = G::init(&self.config, &seats, &start);

        tracing::info!(game_id = id, players = seats.len(), dealer = %start.dealer, "game started");
        self.active.insert(Game {
            id,
            start,
            seats,
            state,
        })
    }

    /// Forfeits a leaving player's seat.
    ///
    /// Does nothing if no game is running or the player isn't seated.
    ///
    /// # Errors
    /// [`GameError::Protocol`] if the engine's reply can't be encoded.
    pub fn forfeit(&mut self, player: PlayerId) -> Result<GameOutbound, GameError> {
        let Some(game) = self.active.as_mut() else {
            return Ok(Vec::new());
        };
        let Some(seat) = game.seats.iter_mut().find(|s| s.player_id == player) else {
            return Ok(Vec::new());
        };
        seat.forfeit();
        tracing::info!(game_id = game.id, %player, "seat forfeited");

        let replies = G::on_player_left(&mut game.state, &mut game.seats, player);
        self.encode_all(replies)
    }

    /// Routes a game payload from `sender` to the engine.
    ///
    /// # Errors
    /// - [`GameError::NoActiveGame`] before the game starts.
    /// - [`GameError::NotSeated`] if the sender has no seat or forfeited it.
    /// - [`GameError::Protocol`] if `data` doesn't decode.
    pub fn handle_message(
        &mut self,
        sender: PlayerId,
        data: &[u8],
    ) -> Result<GameOutbound, GameError> {
        let game = self.active.as_mut().ok_or(GameError::NoActiveGame)?;
        if !game.seats.iter().any(|s| s.player_id == sender && s.active) {
            return Err(GameError::NotSeated(sender));
        }
        let msg: G::ClientMessage = self.codec.decode(data)?;
        let replies = G::handle_message(&mut game.state, &mut game.seats, sender, msg);
        self.encode_all(replies)
    }

    /// Drops the running game.
    pub fn clear(&mut self) {
        self.active = None;
    }

    fn encode_all(
        &self,
        replies: Vec<(Recipient, G::ServerMessage)>,
    ) -> Result<GameOutbound, GameError> {
        replies
            .into_iter()
            .map(|(to, msg)| {
                self.codec
                    .encode(&msg)
                    .map(|bytes| (to, bytes))
                    .map_err(GameError::from)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts actions per player and echoes the running total.
    struct Tally;

    impl GameLogic for Tally {
        type State = u32;
        type ClientMessage = String;
        type ServerMessage = u32;

        fn init(_config: &GameData, _seats: &[Seat], _start: &StartData) -> u32 {
            0
        }

        fn handle_message(
            state: &mut u32,
            _seats: &mut [Seat],
            sender: PlayerId,
            _msg: String,
        ) -> Vec<(Recipient, u32)> {
            *state += 1;
            vec![(Recipient::AllExcept(sender), *state)]
        }

        fn on_player_left(
            _state: &mut u32,
            seats: &mut [Seat],
            _player: PlayerId,
        ) -> Vec<(Recipient, u32)> {
            let remaining = seats.iter().filter(|s| s.active).count() as u32;
            vec![(Recipient::All, remaining)]
        }
    }

    fn roster() -> Vec<PlayerData> {
        vec![
            PlayerData::new(PlayerId(7), "alice", 0),
            PlayerData::new(PlayerId(3), "bob", 1),
        ]
    }

    fn start_data() -> StartData {
        StartData {
            player_count: 2,
            dealer: PlayerId(3),
        }
    }

    #[test]
    fn test_start_funds_seats_and_numbers_games_from_one() {
        let mut coordinator = GameCoordinator::<Tally>::new(GameData::default());

        let game = coordinator.start(&roster(), start_data());

        assert_eq!(game.id, 1);
        assert_eq!(game.player_ids(), vec![PlayerId(7), PlayerId(3)]);
        assert!(game.seats.iter().all(|s| s.cash == 3000 && s.active));
        assert_eq!(coordinator.start(&roster(), start_data()).id, 2);
    }

    #[test]
    fn test_handle_message_without_game_fails() {
        let mut coordinator = GameCoordinator::<Tally>::new(GameData::default());
        let result = coordinator.handle_message(PlayerId(7), br#""bet""#);
        assert!(matches!(result, Err(GameError::NoActiveGame)));
    }

    #[test]
    fn test_handle_message_encodes_engine_replies() {
        let mut coordinator = GameCoordinator::<Tally>::new(GameData::default());
        coordinator.start(&roster(), start_data());

        let out = coordinator.handle_message(PlayerId(7), br#""bet""#).unwrap();

        assert_eq!(out, vec![(Recipient::AllExcept(PlayerId(7)), b"1".to_vec())]);
    }

    #[test]
    fn test_handle_message_undecodable_payload_is_protocol_error() {
        let mut coordinator = GameCoordinator::<Tally>::new(GameData::default());
        coordinator.start(&roster(), start_data());

        let result = coordinator.handle_message(PlayerId(7), b"{not json");
        assert!(matches!(result, Err(GameError::Protocol(_))));
    }

    #[test]
    fn test_forfeit_folds_seat_and_blocks_further_messages() {
        let mut coordinator = GameCoordinator::<Tally>::new(GameData::default());
        coordinator.start(&roster(), start_data());

        let out = coordinator.forfeit(PlayerId(3)).unwrap();

        let seat = coordinator.active().unwrap().seat(PlayerId(3)).unwrap();
        assert_eq!(seat.action, PlayerAction::Folded);
        assert_eq!(seat.cash, 0);
        assert_eq!(seat.stake, 0);
        assert!(!seat.active);
        assert_eq!(out, vec![(Recipient::All, b"1".to_vec())]);
        assert!(matches!(
            coordinator.handle_message(PlayerId(3), br#""bet""#),
            Err(GameError::NotSeated(PlayerId(3)))
        ));
    }

    #[test]
    fn test_forfeit_leaves_other_seats_funded() {
        let mut coordinator = GameCoordinator::<Tally>::new(GameData::default());
        coordinator.start(&roster(), start_data());

        coordinator.forfeit(PlayerId(3)).unwrap();

        let game = coordinator.active().unwrap();
        assert_eq!(game.seat(PlayerId(3)).unwrap().cash, 0);
        let alice = game.seat(PlayerId(7)).unwrap();
        assert_eq!(alice.cash, 3000);
        assert!(alice.active);
    }

    #[test]
    fn test_forfeit_without_game_or_seat_is_noop() {
        let mut coordinator = GameCoordinator::<Tally>::new(GameData::default());
        assert!(coordinator.forfeit(PlayerId(7)).unwrap().is_empty());

        coordinator.start(&roster(), start_data());
        assert!(coordinator.forfeit(PlayerId(99)).unwrap().is_empty());
    }
}
