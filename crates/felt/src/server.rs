//! `FeltServer` builder and server loop.
//!
//! One task owns everything that changes: the phase, the readers, the
//! deferred-close set and the running game. Each iteration of the loop
//! does the same four steps in the same order:
//!
//! 1. take at most one queued connection and register it
//! 2. poll for a readable socket and process what it sent
//! 3. carry out every queued notification
//! 4. release sessions whose grace period is over
//!
//! Outbound packets go to the sender worker; the loop never writes to a
//! socket itself.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use felt_game::{GameCoordinator, GameLogic, GameOutbound, StartData};
use felt_protocol::{
    Codec, ErrorCode, FrameBuffer, JsonCodec, Packet, PlayerId, Recipient, SessionId,
    PROTOCOL_VERSION,
};
use felt_session::{
    Authenticator, DeferredCloseSet, PlayerData, SessionData, SessionError, SessionRegistry,
    SessionState,
};
use felt_transport::{Connection, ConnectionId, ConnectionReader};
use tokio::sync::mpsc;

use crate::handle::{Notification, ServerHandle};
use crate::poller::{PollOutcome, ReadinessPoller};
use crate::sender::Sender;
use crate::{ServerCallback, ServerConfig, ServerError, ServerPhase, TracingCallback};

/// Bytes read from a socket per readiness wake-up.
const READ_CHUNK: usize = 4096;

/// Builder for configuring a felt server.
///
/// # Example
///
/// ```rust,ignore
/// let (server, handle) = FeltServer::builder()
///     .config(ServerConfig::default())
///     .build::<TcpConnection, MyGame, _>(PasswordAuthenticator::new("secret"));
///
/// tokio::spawn(server.run());
/// handle.add_connection(conn)?;
/// ```
pub struct FeltServerBuilder {
    config: ServerConfig,
    callback: Arc<dyn ServerCallback>,
}

impl FeltServerBuilder {
    /// Creates a builder with default settings and a logging callback.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            callback: Arc::new(TracingCallback),
        }
    }

    /// Sets the server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the callback receiving lifecycle events.
    pub fn callback(mut self, callback: impl ServerCallback) -> Self {
        self.callback = Arc::new(callback);
        self
    }

    /// Builds the server and the handle used to feed it.
    ///
    /// Nothing runs until [`FeltServer::run`] is awaited.
    pub fn build<C, G, A>(self, auth: A) -> (FeltServer<C, G, A>, ServerHandle<C>)
    where
        C: Connection,
        G: GameLogic,
        A: Authenticator,
    {
        let (connections_tx, connections_rx) = mpsc::unbounded_channel();
        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let registry = Arc::new(SessionRegistry::new());

        let handle = ServerHandle {
            connections: connections_tx,
            notifications: notifications_tx,
            stop: Arc::clone(&stop),
            registry: Arc::clone(&registry),
        };
        let server = FeltServer {
            config: self.config.validated(),
            callback: self.callback,
            auth,
            registry,
            connections: connections_rx,
            notifications: notifications_rx,
            stop,
            _game: PhantomData,
        };
        (server, handle)
    }
}

impl Default for FeltServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A table server, ready to run.
///
/// Call [`run()`](Self::run) to start the loop; feed it through the
/// [`ServerHandle`] returned by the builder.
///
/// ## Ownership of a connection
///
/// ```text
///  acceptor ──add_connection()──→ connection queue
///                                      │
///                                      ▼ into_split()
///                        ┌─────────────┴─────────────┐
///                        ▼                           ▼
///              reader: server loop          writer: sender worker
///              (polled, decoded)            (frames written in order)
///                        │                           │
///             close_session_delayed()                │
///                        ▼                           │
///              DeferredCloseSet ──grace over──→ Release ──→ shutdown()
/// ```
///
/// ## Phases
///
/// ```text
/// Initial ──first handshake──→ WaitingForPlayers ──StartGame──→ GameRunning
/// ```
///
/// Every loop iteration takes at most one new connection, processes one
/// ready socket, runs queued notifications and sweeps the close set.
pub struct FeltServer<C: Connection, G: GameLogic, A: Authenticator> {
    config: ServerConfig,
    callback: Arc<dyn ServerCallback>,
    auth: A,
    registry: Arc<SessionRegistry>,
    connections: mpsc::UnboundedReceiver<C>,
    notifications: mpsc::UnboundedReceiver<Notification>,
    stop: Arc<AtomicBool>,
    _game: PhantomData<fn() -> G>,
}

impl<C, G, A> FeltServer<C, G, A>
where
    C: Connection,
    G: GameLogic,
    A: Authenticator,
{
    /// Creates a new builder.
    pub fn builder() -> FeltServerBuilder {
        FeltServerBuilder::new()
    }

    /// Runs the server loop until [`ServerHandle::stop`] is called or a
    /// fatal error occurs.
    ///
    /// Either way the sender worker is stopped, waiting at most
    /// `sender_join_timeout` for queued packets to go out, and every
    /// session, queued connection and notification is dropped.
    ///
    /// # Errors
    /// [`ServerError::SelectFailed`] if polling the sockets failed. The
    /// error has already been passed to the callback.
    ///
    /// # Panics
    /// If the dealer draw at game start finds nobody at the drawn ordinal,
    /// which means the seated roster changed under the draw.
    pub async fn run(self) -> Result<(), ServerError> {
        let mut core = ServerLoop::<C, G, A>::new(self);
        let result = core.run_loop().await;
        core.shutdown().await;
        result
    }
}

// ---------------------------------------------------------------------------
// ServerLoop
// ---------------------------------------------------------------------------

/// A socket's read half and the bytes received on it so far.
struct Reception<R> {
    reader: R,
    frames: FrameBuffer,
}

struct ServerLoop<C: Connection, G: GameLogic, A: Authenticator> {
    config: ServerConfig,
    callback: Arc<dyn ServerCallback>,
    auth: A,
    codec: JsonCodec,
    registry: Arc<SessionRegistry>,
    connections: mpsc::UnboundedReceiver<C>,
    notifications: mpsc::UnboundedReceiver<Notification>,
    stop: Arc<AtomicBool>,
    phase: ServerPhase,
    poller: ReadinessPoller,
    sender: Sender<C::Writer>,
    readers: HashMap<ConnectionId, Reception<C::Reader>>,
    closing: DeferredCloseSet<Option<Reception<C::Reader>>>,
    games: GameCoordinator<G>,
    next_session_id: u32,
    next_player_id: u32,
}

impl<C, G, A> ServerLoop<C, G, A>
where
    C: Connection,
    G: GameLogic,
    A: Authenticator,
{
    fn new(server: FeltServer<C, G, A>) -> Self {
        let FeltServer {
            config,
            callback,
            auth,
            registry,
            connections,
            notifications,
            stop,
            _game,
        } = server;

        Self {
            poller: ReadinessPoller::new(config.poll_timeout, config.idle_interval),
            sender: Sender::spawn(Arc::clone(&callback)),
            closing: DeferredCloseSet::new(config.close_grace),
            games: GameCoordinator::new(config.game.clone()),
            config,
            callback,
            auth,
            codec: JsonCodec,
            registry,
            connections,
            notifications,
            stop,
            phase: ServerPhase::Initial,
            readers: HashMap::new(),
            next_session_id: 1,
            next_player_id: 1,
        }
    }

    async fn run_loop(&mut self) -> Result<(), ServerError> {
        tracing::info!(phase = %self.phase, "server loop running");

        while !self.stop.load(Ordering::Acquire) {
            if let Ok(conn) = self.connections.try_recv() {
                self.handle_new_connection(conn);
            }
            if let Err(e) = self.process().await {
                tracing::error!(error = %e, "server loop failed");
                self.callback.server_error(&e);
                return Err(e);
            }
            self.handle_notifications();
            self.close_session_loop();
        }

        tracing::info!("stop requested");
        Ok(())
    }

    async fn shutdown(self) {
        let Self {
            config,
            sender,
            mut connections,
            mut notifications,
            registry,
            mut readers,
            mut closing,
            mut games,
            ..
        } = self;

        sender.shutdown(config.sender_join_timeout).await;

        connections.close();
        let mut dropped = 0;
        while connections.try_recv().is_ok() {
            dropped += 1;
        }
        notifications.close();
        while notifications.try_recv().is_ok() {}

        registry.clear();
        readers.clear();
        closing.clear();
        games.clear();
        tracing::info!(queued_connections_dropped = dropped, "server stopped");
    }

    fn set_phase(&mut self, next: ServerPhase) {
        if self.phase.can_transition_to(next) {
            tracing::info!(from = %self.phase, to = %next, "phase changed");
            self.phase = next;
        }
    }

    // -- New connections ---------------------------------------------------

    fn handle_new_connection(&mut self, conn: C) {
        let conn_id = conn.id();
        if self.registry.session(conn_id).is_some() || self.closing.contains(conn_id) {
            let e = SessionError::DuplicateConnection(conn_id);
            tracing::warn!(%conn_id, error = %e, "connection rejected");
            return;
        }

        if !self.phase.accepts_players() {
            let (reader, writer) = conn.into_split();
            self.sender.register(conn_id, writer);
            self.sender.send(
                conn_id,
                Packet::Error {
                    code: ErrorCode::GameAlreadyRunning,
                },
            );
            tracing::warn!(%conn_id, "connection rejected, game already running");
            let mut session = SessionData::new(conn_id, SessionId(0));
            session.state = SessionState::Closing;
            let reception = self.reception(reader);
            self.closing.insert(session, Some(reception));
            return;
        }

        let session_id = SessionId(self.next_session_id);
        if let Err(e) = self.registry.add_session(SessionData::new(conn_id, session_id)) {
            tracing::warn!(%conn_id, error = %e, "connection rejected");
            return;
        }
        self.next_session_id += 1;

        let (reader, writer) = conn.into_split();
        self.sender.register(conn_id, writer);
        let reception = self.reception(reader);
        self.readers.insert(conn_id, reception);
        tracing::info!(%conn_id, %session_id, "session accepted");
    }

    fn reception(&self, reader: C::Reader) -> Reception<C::Reader> {
        Reception {
            reader,
            frames: FrameBuffer::new(self.config.max_frame_len),
        }
    }

    // -- Receiving -----------------------------------------------------------

    async fn process(&mut self) -> Result<(), ServerError> {
        let handles = self.registry.handles();
        let readers = &self.readers;
        let ready = handles
            .iter()
            .filter_map(|id| readers.get(id).map(|r| (*id, &r.reader)));

        let outcome = self.poller.poll_once(ready).await?;
        if let PollOutcome::Ready(conn_id) = outcome {
            self.receive(conn_id).await;
        }
        Ok(())
    }

    /// Reads what `conn_id` sent and handles every complete packet.
    async fn receive(&mut self, conn_id: ConnectionId) {
        let Some(reception) = self.readers.get_mut(&conn_id) else {
            return;
        };

        let mut buf = [0u8; READ_CHUNK];
        match reception.reader.try_read(&mut buf) {
            Ok(0) => {
                tracing::debug!(%conn_id, "peer closed connection");
                self.close_session_delayed(conn_id);
                return;
            }
            Ok(n) => reception.frames.extend(&buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "read failed");
                self.close_session_delayed(conn_id);
                return;
            }
        }

        let mut frames = Vec::new();
        let mut bad_frame = None;
        loop {
            match reception.frames.next_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(e) => {
                    bad_frame = Some(e);
                    break;
                }
            }
        }

        for frame in frames {
            if !self.readers.contains_key(&conn_id) {
                return;
            }
            match self.codec.decode::<Packet>(&frame) {
                Ok(packet) => self.handle_packet(conn_id, packet).await,
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "undecodable packet");
                    self.session_error(conn_id, ErrorCode::InvalidPacket);
                    return;
                }
            }
        }

        if let Some(e) = bad_frame {
            if self.readers.contains_key(&conn_id) {
                tracing::debug!(%conn_id, error = %e, "bad frame");
                self.session_error(conn_id, ErrorCode::InvalidPacket);
            }
        }
    }

    async fn handle_packet(&mut self, conn_id: ConnectionId, packet: Packet) {
        let Some(wrapper) = self.registry.session(conn_id) else {
            return;
        };
        let state = wrapper.session.state;

        match (self.phase, state, packet) {
            (
                phase,
                SessionState::Connecting,
                Packet::Init {
                    version,
                    password,
                    player_name,
                },
            ) if phase.accepts_players() => {
                self.handshake(wrapper.session, version, &password, player_name)
                    .await;
            }
            (ServerPhase::GameRunning, SessionState::Established, Packet::Game { data }) => {
                let Some(player) = wrapper.player else {
                    return;
                };
                self.game_message(conn_id, player.id, &data);
            }
            (phase, state, packet) => {
                tracing::warn!(%conn_id, %phase, %state, kind = packet.kind(), "unexpected packet");
                self.session_error(conn_id, ErrorCode::InvalidPacket);
            }
        }
    }

    // -- Handshake -----------------------------------------------------------

    async fn handshake(
        &mut self,
        session: SessionData,
        version: u32,
        password: &str,
        player_name: String,
    ) {
        let conn_id = session.conn_id;

        let rejection = if version != PROTOCOL_VERSION {
            Some(ErrorCode::VersionNotSupported)
        } else if self.auth.authenticate(password).await.is_err() {
            Some(ErrorCode::InvalidPassword)
        } else if player_name.trim().is_empty() {
            Some(ErrorCode::InvalidPlayerName)
        } else if self.registry.is_player_connected(&player_name) {
            Some(ErrorCode::PlayerNameInUse)
        } else if self.registry.player_count() >= self.config.game.max_players {
            Some(ErrorCode::ServerFull)
        } else {
            None
        };
        if let Some(code) = rejection {
            tracing::warn!(%conn_id, player = %player_name, %code, "handshake rejected");
            self.session_error(conn_id, code);
            return;
        }

        let seat = self.registry.next_free_seat();
        let player_id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        let player = PlayerData::new(player_id, player_name, seat);
        let seated = self.registry.list_players();

        if let Err(e) = self.set_session_player_data(conn_id, player.clone()) {
            self.callback.server_error(&e);
            self.session_error(conn_id, ErrorCode::InvalidPlayerName);
            return;
        }

        self.sender.send(
            conn_id,
            Packet::InitAck {
                session_id: session.session_id,
                player_id,
                seat,
            },
        );
        for other in seated {
            self.sender.send(conn_id, joined_packet(&other));
        }
        self.send_to_all_but_one(conn_id, joined_packet(&player));

        self.set_phase(ServerPhase::WaitingForPlayers);
    }

    /// Attaches a player to its session, marks it established and tells
    /// the callback.
    fn set_session_player_data(
        &mut self,
        conn_id: ConnectionId,
        player: PlayerData,
    ) -> Result<(), ServerError> {
        let name = player.name.clone();
        let player_id = player.id;
        let seat = player.seat;
        if !self.registry.set_session_player_data(conn_id, player)? {
            return Ok(());
        }
        self.registry
            .set_session_state(conn_id, SessionState::Established);
        tracing::info!(%conn_id, %player_id, player = %name, seat, "player seated");
        self.callback.player_joined(&name);
        Ok(())
    }

    // -- Game traffic --------------------------------------------------------

    fn game_message(&mut self, conn_id: ConnectionId, sender: PlayerId, data: &[u8]) {
        match self.games.handle_message(sender, data) {
            Ok(out) => self.deliver(out),
            Err(e) => {
                tracing::warn!(%conn_id, player_id = %sender, error = %e, "game message rejected");
                self.session_error(conn_id, ErrorCode::InvalidPacket);
            }
        }
    }

    /// Sends game output to its recipients.
    fn deliver(&mut self, out: GameOutbound) {
        for (recipient, data) in out {
            let packet = Packet::Game { data };
            match recipient {
                Recipient::All => self.send_to_all_players(packet),
                Recipient::Player(player_id) => {
                    if let Some(conn_id) = self.registry.conn_of_player(player_id) {
                        self.sender.send(conn_id, packet);
                    }
                }
                Recipient::AllExcept(player_id) => match self.registry.conn_of_player(player_id) {
                    Some(conn_id) => self.send_to_all_but_one(conn_id, packet),
                    None => self.send_to_all_players(packet),
                },
            }
        }
    }

    // -- Notifications -------------------------------------------------------

    fn handle_notifications(&mut self) {
        let mut pending = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            pending.push(notification);
        }

        for notification in pending {
            match notification {
                Notification::StartGame => self.internal_start_game(),
                Notification::KickPlayer(name) => self.internal_kick_player(&name),
            }
        }
    }

    fn internal_start_game(&mut self) {
        if self.phase != ServerPhase::WaitingForPlayers {
            tracing::warn!(phase = %self.phase, "start game ignored");
            return;
        }
        if self.registry.player_count() == 0 {
            tracing::warn!("start game ignored, nobody is seated");
            return;
        }

        self.set_phase(ServerPhase::GameRunning);

        for wrapper in self.registry.not_established() {
            self.session_error(wrapper.conn_id(), ErrorCode::GameAlreadyRunning);
        }

        let roster = self.registry.list_players();
        let start = match StartData::draw(&roster, &mut rand::rng()) {
            Ok(start) => start,
            Err(e) => panic!("dealer selection failed: {e}"),
        };

        let game = self.games.start(&roster, start);
        let packet = Packet::GameStart {
            game_id: game.id,
            dealer: start.dealer,
            players: game.player_ids(),
        };
        self.send_to_all_players(packet);
    }

    fn internal_kick_player(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        let Some(wrapper) = self.registry.session_by_name(name) else {
            tracing::debug!(player = name, "kick ignored, no such player");
            return;
        };
        tracing::info!(conn_id = %wrapper.conn_id(), player = name, "kicking player");
        self.session_error(wrapper.conn_id(), ErrorCode::PlayerKicked);
    }

    // -- Closing -------------------------------------------------------------

    /// Sends one error packet, then closes the session.
    fn session_error(&mut self, conn_id: ConnectionId, code: ErrorCode) {
        self.sender.send(conn_id, Packet::Error { code });
        self.close_session_delayed(conn_id);
    }

    /// Removes a session now and releases its socket after the grace
    /// period.
    fn close_session_delayed(&mut self, conn_id: ConnectionId) {
        let Some(wrapper) = self.registry.remove_session(conn_id) else {
            return;
        };
        let reception = self.readers.remove(&conn_id);

        if let Some(player) = wrapper.player.filter(|p| !p.name.is_empty()) {
            match self.games.forfeit(player.id) {
                Ok(out) => self.deliver(out),
                Err(e) => self.callback.server_error(&ServerError::from(e)),
            }
            self.send_to_all_players(Packet::PlayerLeft {
                player_id: player.id,
            });
            tracing::info!(%conn_id, player_id = %player.id, player = %player.name, "player left");
            self.callback.player_left(&player.name);
        }

        let mut session = wrapper.session;
        session.state = SessionState::Closing;
        self.closing.insert(session, reception);
    }

    fn close_session_loop(&mut self) {
        for entry in self.closing.sweep() {
            self.sender.release(entry.session.conn_id);
        }
    }

    // -- Broadcast -----------------------------------------------------------

    fn send_to_all_players(&self, packet: Packet) {
        for conn_id in self.registry.established_handles(None) {
            self.sender.send(conn_id, packet.clone());
        }
    }

    fn send_to_all_but_one(&self, except: ConnectionId, packet: Packet) {
        for conn_id in self.registry.established_handles(Some(except)) {
            self.sender.send(conn_id, packet.clone());
        }
    }
}

fn joined_packet(player: &PlayerData) -> Packet {
    Packet::PlayerJoined {
        player_id: player.id,
        player_name: player.name.clone(),
        seat: player.seat,
    }
}
