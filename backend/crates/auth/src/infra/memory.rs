//! In-Memory Repository Implementations
//!
//! Used when no database is configured, and by tests. One `RwLock` per
//! collection; a write lock is held for the whole of each check-and-set.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use kernel::id::{IdentityId, SessionId, TenantId};
use tokio::sync::RwLock;

use crate::domain::entity::{
    challenge::Challenge, credential::Credential, identity::Identity,
    refresh_token::RefreshToken, session::Session, tenant::Tenant,
};
use crate::domain::repository::{
    ChallengeRepository, CredentialRepository, IdentityRepository, RefreshTokenRepository,
    RegistrationRepository, RepoResult, RepositoryError, SessionRepository, TenantRepository,
};
use crate::domain::value_object::{email::Email, token_digest::TokenDigest};

#[derive(Default)]
pub struct MemoryAuthStore {
    identities: RwLock<HashMap<IdentityId, Identity>>,
    tenants: RwLock<HashMap<TenantId, Tenant>>,
    credentials: RwLock<HashMap<IdentityId, Credential>>,
    sessions: RwLock<HashMap<SessionId, Session>>,
    refresh_tokens: RwLock<HashMap<TokenDigest, RefreshToken>>,
    challenges: RwLock<HashMap<TokenDigest, Challenge>>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Identity Repository Implementation
// ============================================================================

impl IdentityRepository for MemoryAuthStore {
    async fn get(&self, id: &IdentityId) -> RepoResult<Identity> {
        self.identities
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_email(&self, email: &Email) -> RepoResult<Vec<Identity>> {
        Ok(self
            .identities
            .read()
            .await
            .values()
            .filter(|i| i.email == *email)
            .cloned()
            .collect())
    }

    async fn create(&self, identity: &Identity) -> RepoResult<()> {
        let mut identities = self.identities.write().await;
        if identities.contains_key(&identity.id)
            || identities.values().any(|i| i.email == identity.email)
        {
            return Err(RepositoryError::Conflict);
        }
        identities.insert(identity.id, identity.clone());
        Ok(())
    }

    async fn update(&self, identity: &Identity) -> RepoResult<()> {
        match self.identities.write().await.get_mut(&identity.id) {
            Some(existing) => {
                *existing = identity.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

// ============================================================================
// Tenant Repository Implementation
// ============================================================================

impl TenantRepository for MemoryAuthStore {
    async fn get(&self, id: &TenantId) -> RepoResult<Tenant> {
        self.tenants
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn create(&self, tenant: &Tenant) -> RepoResult<()> {
        let mut tenants = self.tenants.write().await;
        if tenants.contains_key(&tenant.id) {
            return Err(RepositoryError::Conflict);
        }
        tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }
}

// ============================================================================
// Credential Repository Implementation
// ============================================================================

impl CredentialRepository for MemoryAuthStore {
    async fn get(&self, identity_id: &IdentityId) -> RepoResult<Credential> {
        self.credentials
            .read()
            .await
            .get(identity_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn create(&self, credential: &Credential) -> RepoResult<()> {
        let mut credentials = self.credentials.write().await;
        if credentials.contains_key(&credential.identity_id) {
            return Err(RepositoryError::Conflict);
        }
        credentials.insert(credential.identity_id, credential.clone());
        Ok(())
    }

    async fn replace(&self, credential: &Credential) -> RepoResult<()> {
        match self.credentials.write().await.get_mut(&credential.identity_id) {
            Some(existing) => {
                *existing = credential.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

// ============================================================================
// Registration Repository Implementation
// ============================================================================

impl RegistrationRepository for MemoryAuthStore {
    async fn register(
        &self,
        tenant: &Tenant,
        identity: &Identity,
        credential: &Credential,
    ) -> RepoResult<()> {
        // Always identities, tenants, credentials in this order.
        let mut identities = self.identities.write().await;
        let mut tenants = self.tenants.write().await;
        let mut credentials = self.credentials.write().await;

        if identities.contains_key(&identity.id)
            || identities.values().any(|i| i.email == identity.email)
            || tenants.contains_key(&tenant.id)
            || credentials.contains_key(&credential.identity_id)
        {
            return Err(RepositoryError::Conflict);
        }

        tenants.insert(tenant.id, tenant.clone());
        identities.insert(identity.id, identity.clone());
        credentials.insert(credential.identity_id, credential.clone());
        Ok(())
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for MemoryAuthStore {
    async fn create(&self, session: &Session) -> RepoResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> RepoResult<Session> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_active(&self, identity_id: &IdentityId, limit: usize) -> RepoResult<Vec<Session>> {
        let now = Utc::now();
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.identity_id == *identity_id && s.is_active_at(now))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn update(&self, session: &Session) -> RepoResult<()> {
        match self.sessions.write().await.get_mut(&session.id) {
            Some(existing) => {
                *existing = session.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn revoke_all_except(
        &self,
        identity_id: &IdentityId,
        keep: Option<&SessionId>,
    ) -> RepoResult<u64> {
        let mut revoked = 0;
        for session in self.sessions.write().await.values_mut() {
            if session.identity_id == *identity_id && !session.revoked && Some(&session.id) != keep {
                session.revoke();
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

// ============================================================================
// Refresh Token Repository Implementation
// ============================================================================

impl RefreshTokenRepository for MemoryAuthStore {
    async fn create(&self, token: &RefreshToken) -> RepoResult<()> {
        let mut tokens = self.refresh_tokens.write().await;
        if tokens.contains_key(&token.token_hash) {
            return Err(RepositoryError::Conflict);
        }
        tokens.insert(token.token_hash, token.clone());
        Ok(())
    }

    async fn get(&self, token_hash: &TokenDigest) -> RepoResult<RefreshToken> {
        self.refresh_tokens
            .read()
            .await
            .get(token_hash)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn revoke(&self, token_hash: &TokenDigest) -> RepoResult<bool> {
        match self.refresh_tokens.write().await.get_mut(token_hash) {
            Some(token) if !token.revoked => {
                token.revoked = true;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn revoke_for_session(&self, session_id: &SessionId) -> RepoResult<u64> {
        let mut revoked = 0;
        for token in self.refresh_tokens.write().await.values_mut() {
            if token.session_id.as_ref() == Some(session_id) && !token.revoked {
                token.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn revoke_for_identity(
        &self,
        identity_id: &IdentityId,
        keep_session: Option<&SessionId>,
    ) -> RepoResult<u64> {
        let mut revoked = 0;
        for token in self.refresh_tokens.write().await.values_mut() {
            let kept = keep_session.is_some() && token.session_id.as_ref() == keep_session;
            if token.identity_id == *identity_id && !token.revoked && !kept {
                token.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let mut tokens = self.refresh_tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| !t.is_expired_at(now));
        Ok((before - tokens.len()) as u64)
    }
}

// ============================================================================
// Challenge Repository Implementation
// ============================================================================

impl ChallengeRepository for MemoryAuthStore {
    async fn create(&self, challenge: &Challenge) -> RepoResult<()> {
        let mut challenges = self.challenges.write().await;
        if challenges.contains_key(&challenge.token_hash) {
            return Err(RepositoryError::Conflict);
        }
        challenges.insert(challenge.token_hash, challenge.clone());
        Ok(())
    }

    async fn consume(&self, token_hash: &TokenDigest) -> RepoResult<Challenge> {
        self.challenges
            .write()
            .await
            .remove(token_hash)
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let mut challenges = self.challenges.write().await;
        let before = challenges.len();
        challenges.retain(|_, c| !c.is_expired_at(now));
        Ok((before - challenges.len()) as u64)
    }
}
