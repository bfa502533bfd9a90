//! Callbacks from the server loop to the hosting application.

use crate::ServerError;

/// Receives lifecycle events from the server.
///
/// Every method runs synchronously on the server loop's task, except
/// `server_error` for send failures, which runs on the sender worker.
/// Keep implementations short; the loop doesn't advance while they run.
pub trait ServerCallback: Send + Sync + 'static {
    /// A player completed the handshake.
    fn player_joined(&self, name: &str);

    /// A seated player left, was kicked, or lost their connection.
    fn player_left(&self, name: &str);

    /// Something went wrong. Fatal errors are reported exactly once,
    /// right before [`FeltServer::run`](crate::FeltServer::run) returns.
    fn server_error(&self, error: &ServerError);
}

/// Logs every event. The default callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCallback;

impl ServerCallback for TracingCallback {
    fn player_joined(&self, name: &str) {
        tracing::info!(player = name, "player joined");
    }

    fn player_left(&self, name: &str) {
        tracing::info!(player = name, "player left");
    }

    fn server_error(&self, error: &ServerError) {
        if error.is_fatal() {
            tracing::error!(error = %error, os_code = ?error.os_error_code(), "server error");
        } else {
            tracing::debug!(error = %error, "server error");
        }
    }
}
