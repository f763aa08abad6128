//! Read-only session façade
//!
//! Endpoint components observe the session through a [`SessionHandle`]:
//! cookie, user id, readiness, failure state, and an awaitable readiness
//! signal. The handle never mutates session state.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthCore, SessionPhase};
use crate::error::{AuthFailure, Result, StarlineError};
use crate::request::RequestExecutor;
use crate::routes::VendorRoutes;

/// Cheap clonable view of a [`SessionAuthenticator`]'s session.
///
/// [`SessionAuthenticator`]: crate::SessionAuthenticator
#[derive(Clone)]
pub struct SessionHandle {
    core: Arc<AuthCore>,
}

impl SessionHandle {
    pub(crate) fn new(core: Arc<AuthCore>) -> Self {
        Self { core }
    }

    pub(crate) fn executor(&self) -> &RequestExecutor {
        self.core.executor()
    }

    pub(crate) fn routes(&self) -> &VendorRoutes {
        self.core.routes()
    }

    pub fn is_ready(&self) -> bool {
        self.core.snapshot().is_ready()
    }

    pub fn is_failed(&self) -> bool {
        self.core.snapshot().is_failed()
    }

    /// The current session cookie, if ready
    pub fn cookie(&self) -> Option<String> {
        self.core.snapshot().cookie().map(str::to_string)
    }

    /// The authenticated user id, if ready
    pub fn user_id(&self) -> Option<String> {
        self.core.snapshot().user_id().map(str::to_string)
    }

    /// Detail of the last failed attempt, if any
    pub fn failure(&self) -> Option<AuthFailure> {
        self.core.snapshot().failure().cloned()
    }

    /// The session cookie, or [`StarlineError::NotReady`]
    pub(crate) fn require_cookie(&self) -> Result<String> {
        self.cookie().ok_or(StarlineError::NotReady)
    }

    /// Cookie and user id together, or [`StarlineError::NotReady`].
    ///
    /// Reads one consistent snapshot so a refresh racing this call cannot
    /// pair an old cookie with a new user id.
    pub(crate) fn authorized(&self) -> Result<(String, String)> {
        let session = self.core.snapshot();
        match (session.cookie(), session.user_id()) {
            (Some(cookie), Some(user_id)) => Ok((cookie.to_string(), user_id.to_string())),
            _ => Err(StarlineError::NotReady),
        }
    }

    /// Await the session reaching READY.
    ///
    /// Resolves `Ok` when a handshake completes, `Err(AuthFailed)` when one
    /// fails. Driven by the authenticator's phase channel, so there is no
    /// polling interval; the future is cancel-safe.
    pub async fn wait_until_ready(&self) -> Result<()> {
        let mut phases = self.core.subscribe();
        loop {
            let phase = *phases.borrow_and_update();
            match phase {
                SessionPhase::Ready => return Ok(()),
                SessionPhase::Failed => {
                    // A new attempt may already have cleared the failure
                    // detail; in that case keep waiting for its outcome.
                    if let Some(failure) = self.failure() {
                        return Err(StarlineError::AuthFailed(failure));
                    }
                }
                SessionPhase::Pending => {}
            }
            if phases.changed().await.is_err() {
                return Err(StarlineError::AuthFailed(AuthFailure::Transport(
                    "authenticator dropped".into(),
                )));
            }
        }
    }

    /// [`wait_until_ready`](Self::wait_until_ready) bounded by a deadline
    pub async fn wait_until_ready_timeout(&self, limit: Duration) -> Result<()> {
        tokio::time::timeout(limit, self.wait_until_ready())
            .await
            .map_err(|_| StarlineError::Timeout)?
    }
}
