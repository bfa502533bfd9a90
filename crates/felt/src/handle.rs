//! Cross-thread access to a running server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use felt_session::{PlayerData, SessionRegistry};
use felt_transport::Connection;
use tokio::sync::mpsc;

use crate::ServerError;

/// A command executed on the server loop's task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Start the game with everyone currently seated.
    StartGame,
    /// Remove the named player from the table.
    KickPlayer(String),
}

/// Cloneable handle for feeding and controlling a [`FeltServer`].
///
/// Everything here is safe to call from any thread, inside or outside a
/// tokio runtime. Commands are queued and carried out by the server loop
/// on its next iteration; queries read the registry directly.
///
/// [`FeltServer`]: crate::FeltServer
pub struct ServerHandle<C: Connection> {
    pub(crate) connections: mpsc::UnboundedSender<C>,
    pub(crate) notifications: mpsc::UnboundedSender<Notification>,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) registry: Arc<SessionRegistry>,
}

impl<C: Connection> Clone for ServerHandle<C> {
    fn clone(&self) -> Self {
        Self {
            connections: self.connections.clone(),
            notifications: self.notifications.clone(),
            stop: Arc::clone(&self.stop),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<C: Connection> ServerHandle<C> {
    /// Queues a freshly accepted connection.
    ///
    /// # Errors
    /// [`ServerError::Stopped`] once the server loop has exited. The
    /// connection is dropped.
    pub fn add_connection(&self, conn: C) -> Result<(), ServerError> {
        self.connections.send(conn).map_err(|_| ServerError::Stopped)
    }

    /// Queues a control command.
    ///
    /// # Errors
    /// [`ServerError::Stopped`] once the server loop has exited.
    pub fn add_notification(&self, notification: Notification) -> Result<(), ServerError> {
        self.notifications
            .send(notification)
            .map_err(|_| ServerError::Stopped)
    }

    /// Asks the server to start the game.
    pub fn start_game(&self) -> Result<(), ServerError> {
        self.add_notification(Notification::StartGame)
    }

    /// Asks the server to kick a player by name. Unknown names are ignored.
    pub fn kick_player(&self, name: impl Into<String>) -> Result<(), ServerError> {
        self.add_notification(Notification::KickPlayer(name.into()))
    }

    /// Asks the server loop to stop after its current iteration.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Number of seated players.
    pub fn player_count(&self) -> usize {
        self.registry.player_count()
    }

    /// Returns `true` if a seated player uses this name.
    pub fn is_player_connected(&self, name: &str) -> bool {
        self.registry.is_player_connected(name)
    }

    /// Seated players in seat order.
    pub fn players(&self) -> Vec<PlayerData> {
        self.registry.list_players()
    }
}
