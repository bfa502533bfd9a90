//! Dealer selection at game start.

use felt_protocol::PlayerId;
use felt_session::PlayerData;
use rand::Rng;

use crate::GameError;

/// What the engine needs to know about the opening hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartData {
    /// Players seated when the game started.
    pub player_count: usize,
    /// The player holding the dealer button for the first hand.
    pub dealer: PlayerId,
}

impl StartData {
    /// Draws a dealer uniformly from `roster`.
    ///
    /// `roster` must be the seat-sorted list of established players. The
    /// draw picks an ordinal in `0..roster.len()` and the dealer is the
    /// player ranked at that position, whatever their seat number.
    ///
    /// # Errors
    /// - [`GameError::EmptyRoster`] if nobody is seated.
    /// - [`GameError::DealerNotSeated`] if no player holds the drawn
    ///   ordinal.
    pub fn draw<R: Rng + ?Sized>(
        roster: &[PlayerData],
        rng: &mut R,
    ) -> Result<Self, GameError> {
        let count = roster.len();
        if count == 0 {
            return Err(GameError::EmptyRoster);
        }
        let ordinal = rng.random_range(0..count);
        let dealer = roster
            .iter()
            .enumerate()
            .find_map(|(rank, player)| (rank == ordinal).then_some(player.id))
            .ok_or(GameError::DealerNotSeated { ordinal, count })?;

        tracing::debug!(ordinal, count, %dealer, "dealer drawn");
        Ok(Self {
            player_count: count,
            dealer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn roster(seats: &[u32]) -> Vec<PlayerData> {
        seats
            .iter()
            .map(|&seat| PlayerData::new(PlayerId(100 + seat), format!("p{seat}"), seat))
            .collect()
    }

    #[test]
    fn test_draw_empty_roster_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = StartData::draw(&[], &mut rng);
        assert!(matches!(result, Err(GameError::EmptyRoster)));
    }

    #[test]
    fn test_draw_single_player_is_dealer() {
        let mut rng = StdRng::seed_from_u64(1);
        let start = StartData::draw(&roster(&[0]), &mut rng).unwrap();
        assert_eq!(start.player_count, 1);
        assert_eq!(start.dealer, PlayerId(100));
    }

    #[test]
    fn test_draw_dealer_always_in_roster() {
        let mut rng = StdRng::seed_from_u64(7);
        let players = roster(&[0, 1, 2, 3, 4]);
        for _ in 0..200 {
            let start = StartData::draw(&players, &mut rng).unwrap();
            assert!(players.iter().any(|p| p.id == start.dealer));
        }
    }

    #[test]
    fn test_draw_tolerates_gap_in_seats() {
        let mut rng = StdRng::seed_from_u64(3);
        let players = roster(&[0, 2, 5]);
        for _ in 0..100 {
            let start = StartData::draw(&players, &mut rng).unwrap();
            assert_eq!(start.player_count, 3);
            assert!(players.iter().any(|p| p.id == start.dealer));
        }
    }
}
