//! Password check for the handshake.
//!
//! A table is either open or guarded by one shared password. The server
//! core calls the [`Authenticator`] once per [`Init`] packet and turns a
//! failure into [`ErrorCode::InvalidPassword`].
//!
//! [`Init`]: felt_protocol::Packet::Init
//! [`ErrorCode::InvalidPassword`]: felt_protocol::ErrorCode::InvalidPassword

use crate::SessionError;

/// Validates the password a client sends in its handshake.
///
/// # Example
///
/// ```rust
/// use felt_session::{Authenticator, SessionError};
///
/// /// Lets everyone in. Only for local testing.
/// struct OpenTable;
///
/// impl Authenticator for OpenTable {
///     async fn authenticate(&self, _password: &str) -> Result<(), SessionError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Returns `Err(SessionError::AuthFailed)` if the password is rejected.
    fn authenticate(
        &self,
        password: &str,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

/// Compares the client's password against a fixed secret.
///
/// An empty secret accepts any password.
#[derive(Debug, Clone, Default)]
pub struct PasswordAuthenticator {
    secret: String,
}

impl PasswordAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Authenticator for PasswordAuthenticator {
    async fn authenticate(&self, password: &str) -> Result<(), SessionError> {
        if self.secret.is_empty() || self.secret == password {
            Ok(())
        } else {
            Err(SessionError::AuthFailed("password mismatch".into()))
        }
    }
}
