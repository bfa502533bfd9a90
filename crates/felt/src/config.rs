//! Server tunables.

use std::time::Duration;

use felt_game::GameData;
use felt_protocol::DEFAULT_MAX_FRAME_LEN;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for a table server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Longest a single readiness poll waits. Bounds one loop iteration.
    pub poll_timeout: Duration,
    /// How long the loop sleeps when no socket is registered.
    pub idle_interval: Duration,
    /// How long a removed session lingers before its socket is released.
    pub close_grace: Duration,
    /// How long shutdown waits for the sender worker to drain.
    pub sender_join_timeout: Duration,
    /// Largest accepted frame payload, in bytes.
    pub max_frame_len: usize,
    /// Table settings handed to the game.
    pub game: GameData,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(50),
            idle_interval: Duration::from_millis(50),
            close_grace: Duration::from_secs(10),
            sender_join_timeout: Duration::from_secs(2),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            game: GameData::default(),
        }
    }
}

impl ServerConfig {
    /// Replaces values that would stall or spin the loop with defaults.
    ///
    /// Called by the server builder. Rules:
    /// - zero `poll_timeout` or `idle_interval` falls back to the default,
    ///   otherwise the loop would busy-spin.
    /// - zero `max_frame_len` or `game.max_players` falls back to the
    ///   default.
    ///
    /// A zero `close_grace` is kept: sessions are then released on the
    /// next sweep.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.poll_timeout.is_zero() {
            warn!("poll_timeout is zero, using default");
            self.poll_timeout = defaults.poll_timeout;
        }
        if self.idle_interval.is_zero() {
            warn!("idle_interval is zero, using default");
            self.idle_interval = defaults.idle_interval;
        }
        if self.max_frame_len == 0 {
            warn!("max_frame_len is zero, using default");
            self.max_frame_len = defaults.max_frame_len;
        }
        if self.game.max_players == 0 {
            warn!("game.max_players is zero, using default");
            self.game.max_players = defaults.game.max_players;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.poll_timeout, Duration::from_millis(50));
        assert_eq!(config.close_grace, Duration::from_secs(10));
        assert_eq!(config.sender_join_timeout, Duration::from_secs(2));
        assert_eq!(config.max_frame_len, 64 * 1024);
        assert_eq!(config.game.max_players, 10);
    }

    #[test]
    fn test_validated_replaces_zero_intervals() {
        let config = ServerConfig {
            poll_timeout: Duration::ZERO,
            idle_interval: Duration::ZERO,
            max_frame_len: 0,
            ..ServerConfig::default()
        }
        .validated();

        assert_eq!(config.poll_timeout, Duration::from_millis(50));
        assert_eq!(config.idle_interval, Duration::from_millis(50));
        assert_eq!(config.max_frame_len, DEFAULT_MAX_FRAME_LEN);
    }

    #[test]
    fn test_validated_keeps_zero_grace() {
        let config = ServerConfig {
            close_grace: Duration::ZERO,
            ..ServerConfig::default()
        }
        .validated();
        assert_eq!(config.close_grace, Duration::ZERO);
    }

    #[test]
    fn test_validated_keeps_valid_values() {
        let config = ServerConfig {
            poll_timeout: Duration::from_millis(5),
            game: GameData {
                max_players: 4,
                ..GameData::default()
            },
            ..ServerConfig::default()
        }
        .validated();
        assert_eq!(config.poll_timeout, Duration::from_millis(5));
        assert_eq!(config.game.max_players, 4);
    }
}
