//! The sender worker: one task that owns every write half.
//!
//! The server loop never writes to a socket. It hands packets to this
//! worker over a channel and moves on; the worker encodes, frames and
//! writes them in the order they were queued. A failed write is reported
//! to the callback and otherwise ignored: the broken connection shows up
//! on the read side soon after.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use felt_protocol::{Codec, JsonCodec, Packet, encode_frame};
use felt_transport::{ConnectionId, ConnectionWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{ServerCallback, ServerError};

/// Commands the server loop sends to the worker.
#[derive(Debug)]
pub(crate) enum SenderCommand<W> {
    /// Take ownership of a connection's write half.
    Register { conn_id: ConnectionId, writer: W },
    /// Write one packet to a connection.
    Send { conn_id: ConnectionId, packet: Packet },
    /// Shut down and drop a connection's write half once everything
    /// queued before this command is written.
    Release { conn_id: ConnectionId },
}

/// Handle to the running sender worker.
pub(crate) struct Sender<W> {
    tx: mpsc::UnboundedSender<SenderCommand<W>>,
    task: JoinHandle<()>,
}

impl<W: ConnectionWriter> Sender<W> {
    /// Spawns the worker on the current tokio runtime.
    pub(crate) fn spawn(callback: Arc<dyn ServerCallback>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_sender(rx, JsonCodec, callback));
        Self { tx, task }
    }

    pub(crate) fn register(&self, conn_id: ConnectionId, writer: W) {
        self.command(SenderCommand::Register { conn_id, writer });
    }

    pub(crate) fn send(&self, conn_id: ConnectionId, packet: Packet) {
        self.command(SenderCommand::Send { conn_id, packet });
    }

    pub(crate) fn release(&self, conn_id: ConnectionId) {
        self.command(SenderCommand::Release { conn_id });
    }

    fn command(&self, cmd: SenderCommand<W>) {
        if self.tx.send(cmd).is_err() {
            tracing::warn!("sender worker is gone, command dropped");
        }
    }

    /// Stops the worker and waits up to `timeout` for it to drain.
    ///
    /// Commands queued before this call are still carried out. A worker
    /// stuck on a slow peer is aborted once the timeout expires.
    pub(crate) async fn shutdown(self, timeout: Duration) {
        let Self { tx, mut task } = self;
        drop(tx);
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => tracing::debug!("sender worker stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "sender worker failed"),
            Err(_) => {
                tracing::warn!(?timeout, "sender worker did not stop in time, aborting");
                task.abort();
            }
        }
    }
}

async fn run_sender<W, C>(
    mut rx: mpsc::UnboundedReceiver<SenderCommand<W>>,
    codec: C,
    callback: Arc<dyn ServerCallback>,
) where
    W: ConnectionWriter,
    C: Codec,
{
    let mut writers: HashMap<ConnectionId, W> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            SenderCommand::Register { conn_id, writer } => {
                if writers.insert(conn_id, writer).is_some() {
                    tracing::warn!(%conn_id, "writer replaced");
                }
            }
            SenderCommand::Send { conn_id, packet } => {
                let Some(writer) = writers.get_mut(&conn_id) else {
                    tracing::debug!(%conn_id, kind = packet.kind(), "no writer, packet dropped");
                    continue;
                };
                let payload = match codec.encode(&packet) {
                    Ok(payload) => payload,
                    Err(e) => {
                        callback.server_error(&ServerError::from(e));
                        continue;
                    }
                };
                tracing::debug!(%conn_id, kind = packet.kind(), "sending packet");
                if let Err(source) = writer.write_all(&encode_frame(&payload)).await {
                    callback.server_error(&ServerError::SendFailed { conn_id, source });
                }
            }
            SenderCommand::Release { conn_id } => {
                if let Some(mut writer) = writers.remove(&conn_id) {
                    let _ = writer.shutdown().await;
                    tracing::debug!(%conn_id, "writer released");
                }
            }
        }
    }

    for (_, mut writer) in writers {
        let _ = writer.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    use felt_protocol::{ErrorCode, PlayerId};

    /// Shared log of what each mock writer saw.
    type Log = Arc<Mutex<Vec<(ConnectionId, String)>>>;

    struct MockWriter {
        conn_id: ConnectionId,
        log: Log,
        fail: bool,
    }

    impl ConnectionWriter for MockWriter {
        async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            let payload = String::from_utf8_lossy(&data[4..]).into_owned();
            self.log.lock().unwrap().push((self.conn_id, payload));
            Ok(())
        }

        async fn shutdown(&mut self) -> io::Result<()> {
            self.log.lock().unwrap().push((self.conn_id, "<eof>".into()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct ErrorCounter(Mutex<usize>);

    impl ServerCallback for ErrorCounter {
        fn player_joined(&self, _name: &str) {}
        fn player_left(&self, _name: &str) {}
        fn server_error(&self, _error: &ServerError) {
            *self.0.lock().unwrap() += 1;
        }
    }

    fn writer(raw: u64, log: &Log, fail: bool) -> (ConnectionId, MockWriter) {
        let conn_id = ConnectionId::new(raw);
        let writer = MockWriter {
            conn_id,
            log: log.clone(),
            fail,
        };
        (conn_id, writer)
    }

    #[tokio::test]
    async fn test_sender_writes_in_queue_order_then_releases() {
        let log: Log = Arc::default();
        let sender = Sender::spawn(Arc::new(ErrorCounter::default()));
        let (id, w) = writer(1, &log, false);

        sender.register(id, w);
        sender.send(id, Packet::PlayerLeft { player_id: PlayerId(4) });
        sender.send(id, Packet::Error { code: ErrorCode::PlayerKicked });
        sender.release(id);
        sender.send(id, Packet::Game { data: vec![] });
        sender.shutdown(Duration::from_secs(1)).await;

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 3);
        assert!(log[0].1.contains("PlayerLeft"));
        assert!(log[1].1.contains("PlayerKicked"));
        assert_eq!(log[2].1, "<eof>");
    }

    #[tokio::test]
    async fn test_sender_write_failure_reaches_callback_and_continues() {
        let log: Log = Arc::default();
        let errors = Arc::new(ErrorCounter::default());
        let sender = Sender::spawn(errors.clone());
        let (bad, bad_writer) = writer(1, &log, true);
        let (good, good_writer) = writer(2, &log, false);

        sender.register(bad, bad_writer);
        sender.register(good, good_writer);
        sender.send(bad, Packet::Game { data: vec![1] });
        sender.send(good, Packet::Game { data: vec![2] });
        sender.shutdown(Duration::from_secs(1)).await;

        assert_eq!(*errors.0.lock().unwrap(), 1);
        let log = log.lock().unwrap();
        assert!(log.iter().any(|(id, p)| *id == good && p.contains("Game")));
    }

    #[tokio::test]
    async fn test_sender_shutdown_closes_remaining_writers() {
        let log: Log = Arc::default();
        let sender = Sender::spawn(Arc::new(ErrorCounter::default()));
        let (a, wa) = writer(1, &log, false);
        let (b, wb) = writer(2, &log, false);
        sender.register(a, wa);
        sender.register(b, wb);

        sender.shutdown(Duration::from_secs(1)).await;

        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|(_, p)| p == "<eof>").count(), 2);
    }
}
