//! # felt
//!
//! Connection and session manager for a multiplayer poker table.
//!
//! A single server loop multiplexes every client socket, drives the
//! handshake, seats players, starts the game and removes players, while
//! a separate sender worker does all the writing. Other threads talk to
//! the loop through a [`ServerHandle`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use felt::prelude::*;
//!
//! // Implement GameLogic for your engine, then:
//! // let (server, handle) = FeltServer::builder()
//! //     .config(ServerConfig::default())
//! //     .build::<TcpConnection, MyEngine, _>(PasswordAuthenticator::new("secret"));
//! // tokio::spawn(server.run());
//! // loop { handle.add_connection(transport.accept().await?)?; }
//! ```

mod callback;
mod config;
mod error;
mod handle;
mod phase;
mod poller;
mod sender;
mod server;

pub use callback::{ServerCallback, TracingCallback};
pub use config::ServerConfig;
pub use error::ServerError;
pub use handle::{Notification, ServerHandle};
pub use phase::ServerPhase;
pub use poller::{PollOutcome, ReadinessPoller};
pub use server::{FeltServer, FeltServerBuilder};

/// Everything needed to host a table.
pub mod prelude {
    pub use crate::{
        FeltServer, FeltServerBuilder, Notification, ServerCallback, ServerConfig,
        ServerError, ServerHandle, TracingCallback,
    };
    pub use felt_game::{GameData, GameLogic, PlayerAction, Seat, StartData};
    pub use felt_protocol::{
        ErrorCode, Packet, PlayerId, Recipient, SessionId, PROTOCOL_VERSION,
    };
    pub use felt_session::{Authenticator, PasswordAuthenticator, PlayerData, SessionError};
    pub use felt_transport::{Connection, ConnectionId, TcpConnection, TcpTransport};
}
