//! Repository Traits
//!
//! Persistence interfaces for the auth core. Implementations live in the
//! infrastructure layer; the application layer depends only on these.

use chrono::{DateTime, Utc};
use kernel::id::{IdentityId, SessionId, TenantId};
use thiserror::Error;

use crate::domain::entity::{
    challenge::Challenge, credential::Credential, identity::Identity,
    refresh_token::RefreshToken, session::Session, tenant::Tenant,
};
use crate::domain::value_object::{email::Email, token_digest::TokenDigest};

/// Storage-level failure. `NotFound` is the only variant callers are expected
/// to branch on.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

#[trait_variant::make(IdentityRepository: Send)]
pub trait LocalIdentityRepository {
    async fn get(&self, id: &IdentityId) -> RepoResult<Identity>;

    /// Every identity registered under `email`. More than one match is a data
    /// problem the caller must treat as "no match".
    async fn find_by_email(&self, email: &Email) -> RepoResult<Vec<Identity>>;

    async fn create(&self, identity: &Identity) -> RepoResult<()>;

    async fn update(&self, identity: &Identity) -> RepoResult<()>;
}

#[trait_variant::make(TenantRepository: Send)]
pub trait LocalTenantRepository {
    async fn get(&self, id: &TenantId) -> RepoResult<Tenant>;

    async fn create(&self, tenant: &Tenant) -> RepoResult<()>;
}

#[trait_variant::make(CredentialRepository: Send)]
pub trait LocalCredentialRepository {
    async fn get(&self, identity_id: &IdentityId) -> RepoResult<Credential>;

    async fn create(&self, credential: &Credential) -> RepoResult<()>;

    /// Swap the whole record for `credential.identity_id`.
    async fn replace(&self, credential: &Credential) -> RepoResult<()>;
}

#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    async fn create(&self, session: &Session) -> RepoResult<()>;

    async fn get(&self, id: &SessionId) -> RepoResult<Session>;

    /// Unrevoked, unexpired sessions of one identity, newest first.
    async fn list_active(&self, identity_id: &IdentityId, limit: usize)
    -> RepoResult<Vec<Session>>;

    async fn update(&self, session: &Session) -> RepoResult<()>;

    /// Revoke every active session of `identity_id` except `keep`.
    async fn revoke_all_except(
        &self,
        identity_id: &IdentityId,
        keep: Option<&SessionId>,
    ) -> RepoResult<u64>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64>;
}

#[trait_variant::make(RefreshTokenRepository: Send)]
pub trait LocalRefreshTokenRepository {
    async fn create(&self, token: &RefreshToken) -> RepoResult<()>;

    async fn get(&self, token_hash: &TokenDigest) -> RepoResult<RefreshToken>;

    /// Mark revoked. Returns `false` when it already was, so exactly one of
    /// several concurrent callers sees `true`.
    async fn revoke(&self, token_hash: &TokenDigest) -> RepoResult<bool>;

    async fn revoke_for_session(&self, session_id: &SessionId) -> RepoResult<u64>;

    /// Revoke every token of `identity_id` except those bound to `keep_session`.
    async fn revoke_for_identity(
        &self,
        identity_id: &IdentityId,
        keep_session: Option<&SessionId>,
    ) -> RepoResult<u64>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64>;
}

#[trait_variant::make(ChallengeRepository: Send)]
pub trait LocalChallengeRepository {
    async fn create(&self, challenge: &Challenge) -> RepoResult<()>;

    /// Remove and return. A second call with the same hash is `NotFound`.
    async fn consume(&self, token_hash: &TokenDigest) -> RepoResult<Challenge>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64>;
}

#[trait_variant::make(RegistrationRepository: Send)]
pub trait LocalRegistrationRepository {
    /// Store a new tenant, its first identity and the credential as one unit:
    /// either all three are written or none is. A taken email is `Conflict`.
    async fn register(
        &self,
        tenant: &Tenant,
        identity: &Identity,
        credential: &Credential,
    ) -> RepoResult<()>;
}

/// A single backend that serves every repository above.
pub trait AuthStore:
    IdentityRepository
    + TenantRepository
    + CredentialRepository
    + SessionRepository
    + RefreshTokenRepository
    + ChallengeRepository
    + RegistrationRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> AuthStore for T where
    T: IdentityRepository
        + TenantRepository
        + CredentialRepository
        + SessionRepository
        + RefreshTokenRepository
        + ChallengeRepository
        + RegistrationRepository
        + Send
        + Sync
        + 'static
{
}
