//! The session registry: every live session, keyed by connection handle.
//!
//! # Lock discipline
//!
//! All state sits behind one `Mutex`. Every method locks, copies out
//! what it needs, and unlocks before returning, so callers never hold
//! the lock across I/O or callbacks. Only the server core mutates the
//! registry; other threads use the read-only queries (`player_count`,
//! `is_player_connected`, `list_players`), which is why the lock exists
//! at all.
//!
//! A `BTreeMap` keeps iteration in handle order, so "first ready socket"
//! and broadcast order are stable.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use felt_protocol::PlayerId;
use felt_transport::ConnectionId;

use crate::{PlayerData, SessionData, SessionError, SessionState, SessionWrapper};

/// Thread-safe map from connection handle to session.
///
/// ## Lifecycle of an entry
///
/// ```text
/// add_session() ──→ [Connecting] ──set_session_player_data()──→ [Established]
///                        │            + set_session_state()          │
///                        │                                           │
///                        └─────────────── remove_session() ──────────┘
///                                               │
///                                               ▼
///                                     DeferredCloseSet (grace period)
/// ```
///
/// Only `Established` entries count as players: the roster, name lookup,
/// seat allocation and broadcasts all skip sessions still connecting.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<BTreeMap<ConnectionId, SessionWrapper>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A poisoned lock only means another thread panicked mid-query; the
    /// map itself is never left half-updated, so keep using it.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<ConnectionId, SessionWrapper>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new session with no player attached.
    ///
    /// # Errors
    /// [`SessionError::DuplicateConnection`] if the handle is already
    /// registered. The registry is left untouched in that case.
    pub fn add_session(&self, session: SessionData) -> Result<(), SessionError> {
        let conn_id = session.conn_id;
        let mut sessions = self.lock();
        if sessions.contains_key(&conn_id) {
            return Err(SessionError::DuplicateConnection(conn_id));
        }
        sessions.insert(conn_id, SessionWrapper::new(session));
        tracing::debug!(%conn_id, "session registered");
        Ok(())
    }

    /// Looks up a session by connection handle.
    pub fn session(&self, conn_id: ConnectionId) -> Option<SessionWrapper> {
        self.lock().get(&conn_id).cloned()
    }

    /// Looks up an established session by player name.
    pub fn session_by_name(&self, name: &str) -> Option<SessionWrapper> {
        self.lock()
            .values()
            .filter(|w| w.session.is_established())
            .find(|w| w.player.as_ref().is_some_and(|p| p.name == name))
            .cloned()
    }

    /// Looks up the connection handle of an established player.
    pub fn conn_of_player(&self, player_id: PlayerId) -> Option<ConnectionId> {
        self.lock()
            .values()
            .filter(|w| w.session.is_established())
            .find(|w| w.player.as_ref().is_some_and(|p| p.id == player_id))
            .map(SessionWrapper::conn_id)
    }

    /// Attaches player data to an existing session.
    ///
    /// Returns `Ok(false)` without doing anything if the handle is
    /// unknown; callers are expected to have checked that already.
    ///
    /// # Errors
    /// - [`SessionError::EmptyPlayerName`] if the player has no name.
    /// - [`SessionError::PlayerAlreadyAttached`] if the session already
    ///   has a player. The existing player is left in place.
    pub fn set_session_player_data(
        &self,
        conn_id: ConnectionId,
        player: PlayerData,
    ) -> Result<bool, SessionError> {
        if player.name.is_empty() {
            return Err(SessionError::EmptyPlayerName);
        }
        match self.lock().get_mut(&conn_id) {
            Some(wrapper) if wrapper.player.is_some() => {
                Err(SessionError::PlayerAlreadyAttached(conn_id))
            }
            Some(wrapper) => {
                wrapper.player = Some(player);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Moves a session to a new connection state.
    ///
    /// Returns `false` if the handle is unknown.
    pub fn set_session_state(
        &self,
        conn_id: ConnectionId,
        state: SessionState,
    ) -> bool {
        match self.lock().get_mut(&conn_id) {
            Some(wrapper) => {
                wrapper.session.state = state;
                true
            }
            None => false,
        }
    }

    /// Removes a session, returning it if it was registered.
    pub fn remove_session(&self, conn_id: ConnectionId) -> Option<SessionWrapper> {
        self.lock().remove(&conn_id)
    }

    /// Returns every established player, sorted by seat number.
    ///
    /// This is the canonical roster for game start and seat allocation.
    pub fn list_players(&self) -> Vec<PlayerData> {
        let mut players: Vec<PlayerData> = self
            .lock()
            .values()
            .filter(|w| w.session.is_established())
            .filter_map(|w| w.player.clone())
            .collect();
        players.sort_by_key(|p| p.seat);
        players
    }

    /// Returns the first seat not covered by the run of occupied seats
    /// starting at 0.
    ///
    /// Seats `{0, 1, 3}` yield 2; an empty table yields 0.
    pub fn next_free_seat(&self) -> u32 {
        let mut seat = 0;
        for player in self.list_players() {
            if player.seat != seat {
                break;
            }
            seat += 1;
        }
        seat
    }

    /// Number of established players.
    pub fn player_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|w| w.session.is_established() && w.player.is_some())
            .count()
    }

    /// Returns `true` if an established player uses this name.
    pub fn is_player_connected(&self, name: &str) -> bool {
        self.session_by_name(name).is_some()
    }

    /// All registered handles, in handle order.
    pub fn handles(&self) -> Vec<ConnectionId> {
        self.lock().keys().copied().collect()
    }

    /// Handles of established sessions, minus an optional excluded one.
    pub fn established_handles(
        &self,
        except: Option<ConnectionId>,
    ) -> Vec<ConnectionId> {
        self.lock()
            .iter()
            .filter(|(_, w)| w.session.is_established())
            .filter(|(id, _)| Some(**id) != except)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Sessions that haven't completed their handshake.
    pub fn not_established(&self) -> Vec<SessionWrapper> {
        self.lock()
            .values()
            .filter(|w| !w.session.is_established())
            .cloned()
            .collect()
    }

    /// Number of registered sessions in any state.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no session is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every session.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
