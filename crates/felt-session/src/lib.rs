//! Session management for felt.
//!
//! This crate tracks who is connected to a table:
//!
//! 1. **Sessions**: one [`SessionData`] per accepted connection, moving
//!    through [`SessionState`] as the handshake completes.
//! 2. **Registry**: the [`SessionRegistry`] maps connection handles to
//!    sessions and answers player-facing queries (roster, name lookup,
//!    free seat).
//! 3. **Deferred close**: the [`DeferredCloseSet`] keeps removed
//!    sessions alive for a grace period so queued writes can flush.
//! 4. **Authentication**: the [`Authenticator`] trait checks the table
//!    password during the handshake.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server core (above)  ← owns the registry, drives handshakes
//!     ↕
//! Session Layer (this crate)  ← connection state + player identity
//!     ↕
//! Protocol / Transport (below)  ← PlayerId, SessionId, ConnectionId
//! ```

mod auth;
mod close;
mod error;
mod registry;
mod session;

pub use auth::{Authenticator, PasswordAuthenticator};
pub use close::{DeferredClose, DeferredCloseSet};
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{PlayerData, SessionData, SessionState, SessionWrapper};
