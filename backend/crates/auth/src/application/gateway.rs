//! Auth Gateway
//!
//! Entry point for every token operation. A login runs
//! `Received -> Verifying -> {Rejected | ChallengeIssued | TokensIssued}`;
//! issuing tokens also records a session and the last-login time, both
//! best-effort.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use kernel::id::{IdentityId, SessionId};
use platform::client::ClientOrigin;

use crate::application::config::AuthConfig;
use crate::application::credential_verifier::{CredentialVerifier, Verification};
use crate::application::introspection::{Introspection, IntrospectionService};
use crate::application::session_tracker::SessionTracker;
use crate::application::token_issuer::{OPAQUE_TOKEN_BYTES, TOKEN_TYPE_BEARER, TokenIssuer};
use crate::domain::entity::{
    challenge::Challenge, identity::Identity, refresh_token::RefreshToken, session::Session,
};
use crate::domain::repository::{
    ChallengeRepository, CredentialRepository, IdentityRepository, RefreshTokenRepository,
    RepositoryError, SessionRepository,
};
use crate::domain::value_object::password::RawPassword;
use crate::domain::value_object::token_digest::TokenDigest;
use crate::error::{AuthError, AuthResult};

// =============================================================================
// Grant type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrantType {
    #[default]
    Unspecified,
    Password,
    RefreshToken,
    ClientCredentials,
}

impl GrantType {
    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            0 => Some(GrantType::Unspecified),
            1 => Some(GrantType::Password),
            2 => Some(GrantType::RefreshToken),
            3 => Some(GrantType::ClientCredentials),
            _ => None,
        }
    }

    /// Accepts `GRANT_TYPE_PASSWORD`, `password` and similar spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let name = name.strip_prefix("grant_type_").unwrap_or(&name);
        match name {
            "" | "unspecified" => Some(GrantType::Unspecified),
            "password" => Some(GrantType::Password),
            "refresh_token" => Some(GrantType::RefreshToken),
            "client_credentials" => Some(GrantType::ClientCredentials),
            _ => None,
        }
    }
}

// =============================================================================
// Login state machine
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UnsupportedGrant,
    InvalidCredentials,
    AccountDisabled,
    InvalidChallenge,
    InvalidSecondFactor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Received,
    Verifying,
    Rejected(RejectReason),
    ChallengeIssued,
    TokensIssued,
}

impl LoginStage {
    pub fn can_advance_to(&self, next: LoginStage) -> bool {
        use LoginStage::*;
        matches!(
            (self, next),
            (Received, Verifying)
                | (Received, Rejected(_))
                | (Verifying, Rejected(_))
                | (Verifying, ChallengeIssued)
                | (Verifying, TokensIssued)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoginStage::Rejected(_) | LoginStage::ChallengeIssued | LoginStage::TokensIssued
        )
    }
}

/// Tracks one attempt through [`LoginStage`] and logs where it ended.
struct LoginAttempt {
    stage: LoginStage,
    started: Instant,
}

impl LoginAttempt {
    fn start() -> Self {
        Self {
            stage: LoginStage::Received,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: LoginStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal login transition {:?} -> {:?}",
            self.stage,
            next
        );
        self.stage = next;
        if next.is_terminal() {
            tracing::debug!(
                stage = ?next,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "Login attempt finished"
            );
        }
    }

    fn reject(&mut self, reason: RejectReason, err: AuthError) -> AuthError {
        self.advance(LoginStage::Rejected(reason));
        err
    }
}

// =============================================================================
// Results
// =============================================================================

#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub refresh_token: String,
    pub identity: Identity,
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone)]
pub enum TokenGrant {
    Issued(IssuedTokens),
    /// Second factor pending; exchange `mfa_token` via `verify_second_factor`.
    ChallengeRequired { mfa_token: String, expires_in: i64 },
}

// =============================================================================
// Gateway
// =============================================================================

pub struct AuthGateway<I, C, S, R, M>
where
    I: IdentityRepository,
    C: CredentialRepository,
    S: SessionRepository,
    R: RefreshTokenRepository,
    M: ChallengeRepository,
{
    verifier: CredentialVerifier<I, C>,
    sessions: SessionTracker<S>,
    refresh_repo: Arc<R>,
    challenge_repo: Arc<M>,
    issuer: Arc<TokenIssuer>,
    introspection: IntrospectionService,
    config: Arc<AuthConfig>,
}

impl<I, C, S, R, M> AuthGateway<I, C, S, R, M>
where
    I: IdentityRepository,
    C: CredentialRepository,
    S: SessionRepository,
    R: RefreshTokenRepository,
    M: ChallengeRepository,
{
    pub fn new(
        verifier: CredentialVerifier<I, C>,
        sessions: SessionTracker<S>,
        refresh_repo: Arc<R>,
        challenge_repo: Arc<M>,
        issuer: Arc<TokenIssuer>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            verifier,
            sessions,
            refresh_repo,
            challenge_repo,
            introspection: IntrospectionService::new(issuer.clone()),
            issuer,
            config,
        }
    }

    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }

    pub fn introspect(&self, token: &str) -> Introspection {
        self.introspection.introspect(token)
    }

    pub async fn create_token(
        &self,
        grant_type: GrantType,
        username: &str,
        password: String,
        origin: &ClientOrigin,
    ) -> AuthResult<TokenGrant> {
        let mut attempt = LoginAttempt::start();

        if grant_type != GrantType::Password {
            return Err(attempt.reject(
                RejectReason::UnsupportedGrant,
                AuthError::InvalidArgument("only password grant supported".to_string()),
            ));
        }
        if username.trim().is_empty() {
            return Err(attempt.reject(
                RejectReason::InvalidCredentials,
                AuthError::InvalidArgument("username is required".to_string()),
            ));
        }

        attempt.advance(LoginStage::Verifying);
        let password = RawPassword::for_login(password);
        let verification = match self.verifier.verify(username, password).await {
            Ok(v) => v,
            Err(e) => return Err(attempt.reject(RejectReason::InvalidCredentials, e)),
        };

        match verification {
            Verification::InvalidCredentials => Err(attempt.reject(
                RejectReason::InvalidCredentials,
                AuthError::InvalidCredentials,
            )),
            Verification::AccountDisabled => Err(attempt.reject(
                RejectReason::AccountDisabled,
                AuthError::AccountDisabled,
            )),
            Verification::TwoFactorRequired(identity) => {
                let grant = self.issue_challenge(&identity).await?;
                attempt.advance(LoginStage::ChallengeIssued);
                Ok(grant)
            }
            Verification::Authenticated(identity) => {
                let tokens = self.complete_login(identity, origin).await?;
                attempt.advance(LoginStage::TokensIssued);
                Ok(TokenGrant::Issued(tokens))
            }
        }
    }

    pub async fn verify_second_factor(
        &self,
        mfa_token: &str,
        code: &str,
        origin: &ClientOrigin,
    ) -> AuthResult<IssuedTokens> {
        let mut attempt = LoginAttempt::start();

        // Consumed even when the code turns out wrong.
        let challenge = match self.challenge_repo.consume(&TokenDigest::of(mfa_token.trim())).await {
            Ok(challenge) if !challenge.is_expired_at(Utc::now()) => challenge,
            Ok(_) | Err(RepositoryError::NotFound) => {
                return Err(attempt.reject(RejectReason::InvalidChallenge, AuthError::InvalidToken));
            }
            Err(e) => return Err(e.into()),
        };

        attempt.advance(LoginStage::Verifying);

        let identity = match self.verifier.identities().get(&challenge.identity_id).await {
            Ok(identity) => identity,
            Err(RepositoryError::NotFound) => {
                return Err(attempt.reject(RejectReason::InvalidChallenge, AuthError::InvalidToken));
            }
            Err(e) => return Err(e.into()),
        };
        if !identity.active {
            return Err(attempt.reject(RejectReason::AccountDisabled, AuthError::AccountDisabled));
        }

        let credential = self.verifier.credentials().get(&identity.id).await?;
        let secret = credential
            .totp_secret
            .as_ref()
            .ok_or(AuthError::TwoFactorNotSetup)?;

        if !secret.verify(code, &self.config.totp_issuer, identity.email.as_str())? {
            return Err(attempt.reject(
                RejectReason::InvalidSecondFactor,
                AuthError::InvalidTwoFactorCode,
            ));
        }

        let tokens = self.complete_login(identity, origin).await?;
        attempt.advance(LoginStage::TokensIssued);
        Ok(tokens)
    }

    /// Rotate a refresh token. A token that was already revoked is treated as
    /// stolen and takes every refresh token of its identity down with it.
    /// A token bound to a session dies with that session.
    pub async fn refresh_token(&self, raw: &str, origin: &ClientOrigin) -> AuthResult<IssuedTokens> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::InvalidArgument("refresh_token is required".to_string()));
        }
        let digest = TokenDigest::of(raw);

        let record = match self.refresh_repo.get(&digest).await {
            Ok(record) => record,
            Err(RepositoryError::NotFound) => return Err(AuthError::InvalidToken),
            Err(e) => return Err(e.into()),
        };

        if record.revoked {
            let revoked = self
                .refresh_repo
                .revoke_for_identity(&record.identity_id, None)
                .await?;
            tracing::warn!(
                identity_id = %record.identity_id,
                token = %record.token_hash,
                revoked,
                "Revoked refresh token presented again, revoking all tokens of identity"
            );
            return Err(AuthError::InvalidToken);
        }
        if record.is_expired_at(Utc::now()) {
            return Err(AuthError::InvalidToken);
        }

        let session = match &record.session_id {
            Some(session_id) => match self.sessions.active(session_id).await? {
                Some(session) => Some(session),
                None => {
                    tracing::info!(
                        identity_id = %record.identity_id,
                        session_id = %session_id,
                        "Refresh token presented for an ended session"
                    );
                    return Err(AuthError::InvalidToken);
                }
            },
            None => None,
        };

        let identity = match self.verifier.identities().get(&record.identity_id).await {
            Ok(identity) => identity,
            Err(RepositoryError::NotFound) => return Err(AuthError::InvalidToken),
            Err(e) => return Err(e.into()),
        };
        if !identity.active {
            return Err(AuthError::AccountDisabled);
        }

        // Of two concurrent refreshes only one wins the revoke.
        if !self.refresh_repo.revoke(&digest).await? {
            return Err(AuthError::InvalidToken);
        }

        if let Some(session) = &session {
            self.sessions.touch(&session.id).await;
        }

        let tokens = self.mint(&identity, session.as_ref()).await?;
        tracing::info!(
            identity_id = %identity.id,
            session_id = ?record.session_id,
            ip = ?origin.ip,
            "Refresh token rotated"
        );
        Ok(tokens)
    }

    /// Accepts either kind of token. Unknown tokens are ignored.
    pub async fn revoke_token(&self, token: &str) -> AuthResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidArgument("token is required".to_string()));
        }

        let digest = TokenDigest::of(token);
        match self.refresh_repo.get(&digest).await {
            Ok(record) => {
                self.refresh_repo.revoke(&digest).await?;
                if let Some(session_id) = &record.session_id {
                    self.end_session(&record.identity_id, session_id).await?;
                }
                tracing::info!(identity_id = %record.identity_id, "Refresh token revoked");
                return Ok(());
            }
            Err(RepositoryError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        if let Ok(claims) = self.issuer.validate(token)
            && let (Some(identity_id), Some(session_id)) = (claims.identity_id(), claims.session_id())
        {
            self.end_session(&identity_id, &session_id).await?;
            tracing::info!(identity_id = %identity_id, session_id = %session_id, "Session revoked by access token");
        }
        Ok(())
    }

    pub async fn list_sessions(
        &self,
        identity_id: &IdentityId,
        limit: Option<i64>,
    ) -> AuthResult<Vec<Session>> {
        self.sessions.list(identity_id, limit).await
    }

    pub async fn revoke_session(
        &self,
        identity_id: &IdentityId,
        session_id: &SessionId,
    ) -> AuthResult<()> {
        self.sessions.revoke(identity_id, session_id).await?;
        self.refresh_repo.revoke_for_session(session_id).await?;
        Ok(())
    }

    pub async fn revoke_all_other_sessions(
        &self,
        identity_id: &IdentityId,
        current: Option<&SessionId>,
    ) -> AuthResult<u64> {
        let revoked = self.sessions.revoke_all_except(identity_id, current).await?;
        self.refresh_repo
            .revoke_for_identity(identity_id, current)
            .await?;
        Ok(revoked)
    }

    // -------------------------------------------------------------------------

    async fn issue_challenge(&self, identity: &Identity) -> AuthResult<TokenGrant> {
        let mfa_token = platform::crypto::opaque_token(OPAQUE_TOKEN_BYTES);
        let ttl = AuthConfig::chrono(self.config.mfa_challenge_ttl);
        let challenge = Challenge::new(&mfa_token, identity.id, ttl);
        self.challenge_repo.create(&challenge).await?;

        tracing::info!(identity_id = %identity.id, "Second factor challenge issued");
        Ok(TokenGrant::ChallengeRequired {
            mfa_token,
            expires_in: ttl.num_seconds(),
        })
    }

    async fn complete_login(&self, mut identity: Identity, origin: &ClientOrigin) -> AuthResult<IssuedTokens> {
        let session = self.sessions.record(identity.id, origin).await;

        let tokens = match self.mint(&identity, session.as_ref()).await {
            Ok(tokens) => tokens,
            Err(e) => {
                if let Some(session) = &session {
                    self.sessions.discard(session).await;
                }
                return Err(e);
            }
        };
        let session_id = tokens.session_id;

        identity.record_login();
        if let Err(e) = self.verifier.identities().update(&identity).await {
            tracing::warn!(identity_id = %identity.id, error = %e, "Failed to update last login");
        }

        tracing::info!(identity_id = %identity.id, session_id = ?session_id, "Login succeeded");
        Ok(IssuedTokens { identity, ..tokens })
    }

    /// Access token plus a persisted refresh token bound to `session`, which
    /// never outlives it.
    async fn mint(&self, identity: &Identity, session: Option<&Session>) -> AuthResult<IssuedTokens> {
        let session_id = session.map(|s| s.id);
        let access = self.issuer.issue_access(identity, session_id)?;

        let refresh_token = self.issuer.issue_refresh();
        let mut record = RefreshToken::new(
            &refresh_token,
            identity.id,
            session_id,
            AuthConfig::chrono(self.config.refresh_token_ttl),
        );
        if let Some(session) = session {
            record = record.expiring_by(session.expires_at);
        }
        self.refresh_repo.create(&record).await?;

        Ok(IssuedTokens {
            access_token: access.token,
            token_type: TOKEN_TYPE_BEARER,
            expires_in: access.expires_in,
            refresh_token,
            identity: identity.clone(),
            session_id,
        })
    }

    async fn end_session(&self, identity_id: &IdentityId, session_id: &SessionId) -> AuthResult<()> {
        match self.sessions.revoke(identity_id, session_id).await {
            Ok(_) | Err(AuthError::SessionNotFound) => {}
            Err(e) => return Err(e),
        }
        self.refresh_repo.revoke_for_session(session_id).await?;
        Ok(())
    }
}
