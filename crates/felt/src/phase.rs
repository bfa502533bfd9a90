//! Game phases of a table server.

/// Which phase the table is in.
///
/// Phases only move forward:
///
/// ```text
/// Initial → WaitingForPlayers → GameRunning
/// ```
///
/// - **Initial**: nobody has joined yet. Connections are accepted and
///   handshakes processed.
/// - **WaitingForPlayers**: at least one player is seated; the host may
///   start the game.
/// - **GameRunning**: the game started. New connections are turned away
///   with `GameAlreadyRunning`; seated players' game packets go to the
///   running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerPhase {
    #[default]
    Initial,
    WaitingForPlayers,
    GameRunning,
}

impl ServerPhase {
    /// Returns `true` if new connections may perform a handshake.
    pub fn accepts_players(&self) -> bool {
        matches!(self, Self::Initial | Self::WaitingForPlayers)
    }

    /// The phase after this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Initial => Some(Self::WaitingForPlayers),
            Self::WaitingForPlayers => Some(Self::GameRunning),
            Self::GameRunning => None,
        }
    }

    /// Returns `true` if moving to `target` is allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for ServerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "Initial"),
            Self::WaitingForPlayers => write!(f, "WaitingForPlayers"),
            Self::GameRunning => write!(f, "GameRunning"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_next_follows_strict_order() {
        assert_eq!(ServerPhase::Initial.next(), Some(ServerPhase::WaitingForPlayers));
        assert_eq!(
            ServerPhase::WaitingForPlayers.next(),
            Some(ServerPhase::GameRunning)
        );
        assert_eq!(ServerPhase::GameRunning.next(), None);
    }

    #[test]
    fn test_phase_can_transition_to() {
        assert!(ServerPhase::Initial.can_transition_to(ServerPhase::WaitingForPlayers));
        assert!(!ServerPhase::Initial.can_transition_to(ServerPhase::GameRunning));
        assert!(!ServerPhase::GameRunning.can_transition_to(ServerPhase::Initial));
    }

    #[test]
    fn test_phase_accepts_players() {
        assert!(ServerPhase::Initial.accepts_players());
        assert!(ServerPhase::WaitingForPlayers.accepts_players());
        assert!(!ServerPhase::GameRunning.accepts_players());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(ServerPhase::default().to_string(), "Initial");
        assert_eq!(ServerPhase::GameRunning.to_string(), "GameRunning");
    }
}
