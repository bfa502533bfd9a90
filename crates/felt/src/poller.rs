//! Readiness multiplexing over every registered socket.

use std::io;
use std::time::Duration;

use felt_transport::{ConnectionId, ConnectionReader};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, select_all};

use crate::ServerError;

/// Result of one readiness poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// This connection has data, EOF or an error pending.
    Ready(ConnectionId),
    /// Nothing became readable before the timeout.
    TimedOut,
}

/// Waits for the first readable connection, with a bounded timeout.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPoller {
    timeout: Duration,
    idle: Duration,
}

impl ReadinessPoller {
    pub fn new(timeout: Duration, idle: Duration) -> Self {
        Self { timeout, idle }
    }

    /// Polls `readers` once.
    ///
    /// With no readers at all this sleeps for the idle interval and
    /// reports `TimedOut`, so an empty table doesn't spin. When several
    /// readers are ready at once, the first one in iteration order wins.
    ///
    /// # Errors
    /// [`ServerError::SelectFailed`] if a readiness wait fails. An
    /// interrupted wait is not an error and counts as a timeout.
    pub async fn poll_once<'a, R, I>(&self, readers: I) -> Result<PollOutcome, ServerError>
    where
        R: ConnectionReader,
        I: IntoIterator<Item = (ConnectionId, &'a R)>,
    {
        let waits: Vec<BoxFuture<'a, (ConnectionId, io::Result<()>)>> = readers
            .into_iter()
            .map(|(conn_id, reader)| async move { (conn_id, reader.readable().await) }.boxed())
            .collect();

        if waits.is_empty() {
            tokio::time::sleep(self.idle).await;
            return Ok(PollOutcome::TimedOut);
        }

        match tokio::time::timeout(self.timeout, select_all(waits)).await {
            Err(_) => Ok(PollOutcome::TimedOut),
            Ok(((conn_id, Ok(())), _, _)) => Ok(PollOutcome::Ready(conn_id)),
            Ok(((conn_id, Err(e)), _, _)) if e.kind() == io::ErrorKind::Interrupted => {
                tracing::debug!(%conn_id, "readiness wait interrupted");
                Ok(PollOutcome::TimedOut)
            }
            Ok(((_, Err(e)), _, _)) => Err(ServerError::SelectFailed(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    /// Reader whose readiness is fixed at construction.
    enum MockReader {
        Never,
        Ready,
        Fails(io::ErrorKind),
    }

    impl ConnectionReader for MockReader {
        async fn readable(&self) -> io::Result<()> {
            match self {
                Self::Never => std::future::pending().await,
                Self::Ready => Ok(()),
                Self::Fails(kind) => Err(io::Error::from(*kind)),
            }
        }

        fn try_read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::WouldBlock.into())
        }
    }

    fn id(raw: u64) -> ConnectionId {
        ConnectionId::new(raw)
    }

    fn poller() -> ReadinessPoller {
        ReadinessPoller::new(Duration::from_millis(30), Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_poll_once_empty_sleeps_idle_interval() {
        let poller = poller();
        let started = Instant::now();

        for _ in 0..5 {
            let outcome = poller
                .poll_once(std::iter::empty::<(ConnectionId, &MockReader)>())
                .await
                .unwrap();
            assert_eq!(outcome, PollOutcome::TimedOut);
        }

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "spun: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "blocked: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_poll_once_nothing_ready_times_out() {
        let never = MockReader::Never;
        let started = Instant::now();

        let outcome = poller().poll_once([(id(1), &never)]).await.unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_poll_once_returns_first_ready_handle() {
        let never = MockReader::Never;
        let ready_a = MockReader::Ready;
        let ready_b = MockReader::Ready;

        let outcome = poller()
            .poll_once([(id(1), &never), (id(2), &ready_a), (id(3), &ready_b)])
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Ready(id(2)));
    }

    #[tokio::test]
    async fn test_poll_once_interrupted_counts_as_timeout() {
        let interrupted = MockReader::Fails(io::ErrorKind::Interrupted);

        let outcome = poller().poll_once([(id(1), &interrupted)]).await.unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_poll_once_other_error_is_select_failed() {
        let broken = MockReader::Fails(io::ErrorKind::InvalidInput);

        let result = poller().poll_once([(id(1), &broken)]).await;

        assert!(matches!(result, Err(ServerError::SelectFailed(e)) if e.kind() == io::ErrorKind::InvalidInput));
    }
}
