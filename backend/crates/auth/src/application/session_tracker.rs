//! Session Tracker
//!
//! One session row per successful login, independent of the tokens minted for
//! it. Recording is best-effort: a failed write never fails the login.

use std::sync::Arc;

use kernel::id::{IdentityId, SessionId};
use platform::client::ClientOrigin;

use crate::application::config::AuthConfig;
use crate::domain::entity::session::Session;
use crate::domain::repository::{RepositoryError, SessionRepository};
use crate::error::{AuthError, AuthResult};

pub const MAX_LIST_LIMIT: usize = 100;

/// Absent, non-positive and oversized limits all mean the maximum.
pub fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        Some(n) if n > 0 && n <= MAX_LIST_LIMIT as i64 => n as usize,
        _ => MAX_LIST_LIMIT,
    }
}

pub struct SessionTracker<S>
where
    S: SessionRepository,
{
    session_repo: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S> SessionTracker<S>
where
    S: SessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self {
            session_repo,
            config,
        }
    }

    pub async fn record(&self, identity_id: IdentityId, origin: &ClientOrigin) -> Option<Session> {
        let session = Session::new(
            identity_id,
            origin,
            AuthConfig::chrono(self.config.session_ttl),
        );

        match self.session_repo.create(&session).await {
            Ok(()) => {
                tracing::info!(
                    identity_id = %identity_id,
                    session_id = %session.id,
                    ip = ?session.ip_address,
                    "Session recorded"
                );
                Some(session)
            }
            Err(e) => {
                tracing::warn!(identity_id = %identity_id, error = %e, "Failed to record session");
                None
            }
        }
    }

    pub async fn list(&self, identity_id: &IdentityId, limit: Option<i64>) -> AuthResult<Vec<Session>> {
        let sessions = self
            .session_repo
            .list_active(identity_id, clamp_limit(limit))
            .await?;
        Ok(sessions)
    }

    /// Sessions of other identities are reported as missing.
    pub async fn revoke(&self, identity_id: &IdentityId, session_id: &SessionId) -> AuthResult<Session> {
        let mut session = match self.session_repo.get(session_id).await {
            Ok(session) if session.identity_id == *identity_id => session,
            Ok(_) | Err(RepositoryError::NotFound) => return Err(AuthError::SessionNotFound),
            Err(e) => return Err(e.into()),
        };

        if !session.revoked {
            session.revoke();
            self.session_repo.update(&session).await?;
            tracing::info!(identity_id = %identity_id, session_id = %session_id, "Session revoked");
        }
        Ok(session)
    }

    pub async fn revoke_all_except(
        &self,
        identity_id: &IdentityId,
        current: Option<&SessionId>,
    ) -> AuthResult<u64> {
        let revoked = self
            .session_repo
            .revoke_all_except(identity_id, current)
            .await?;
        tracing::info!(identity_id = %identity_id, revoked, "Other sessions revoked");
        Ok(revoked)
    }

    /// The session while it is unrevoked and unexpired. Missing, revoked and
    /// expired sessions are all `None`.
    pub async fn active(&self, session_id: &SessionId) -> AuthResult<Option<Session>> {
        match self.session_repo.get(session_id).await {
            Ok(session) if session.is_active() => Ok(Some(session)),
            Ok(_) | Err(RepositoryError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Undo a [`Self::record`] whose login failed afterwards. Best-effort.
    pub async fn discard(&self, session: &Session) {
        let mut session = session.clone();
        session.revoke();
        if let Err(e) = self.session_repo.update(&session).await {
            tracing::warn!(session_id = %session.id, error = %e, "Failed to discard session");
        }
    }

    /// Bump `last_active_at`. Failures are only logged.
    pub async fn touch(&self, session_id: &SessionId) {
        let result = match self.session_repo.get(session_id).await {
            Ok(mut session) if session.is_active() => {
                session.touch();
                self.session_repo.update(&session).await
            }
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::debug!(session_id = %session_id, error = %e, "Failed to touch session");
        }
    }
}
