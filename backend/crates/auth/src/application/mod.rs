//! Application Layer
//!
//! Use cases and application services.

pub mod account;
pub mod config;
pub mod credential_verifier;
pub mod gateway;
pub mod introspection;
pub mod registration;
pub mod session_tracker;
pub mod token_issuer;
pub mod two_factor;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use platform::password::BreachChecker;

use crate::domain::repository::{
    AuthStore, ChallengeRepository, RefreshTokenRepository, SessionRepository,
};
use crate::domain::value_object::password::StoredPassword;
use crate::error::{AuthError, AuthResult};

// Re-exports
pub use account::AccountService;
pub use config::AuthConfig;
pub use credential_verifier::{CredentialVerifier, Verification};
pub use gateway::{AuthGateway, GrantType, IssuedTokens, LoginStage, TokenGrant};
pub use introspection::{Introspection, IntrospectionService};
pub use registration::{RegisterInput, Registration};
pub use session_tracker::SessionTracker;
pub use token_issuer::{AccessClaims, AccessToken, TokenIssuer, TokenRejection};
pub use two_factor::TwoFactorSetup;

const BREACH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Rows removed by [`AuthServices::purge_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub sessions: u64,
    pub refresh_tokens: u64,
    pub challenges: u64,
}

/// Every use case wired against one store.
pub struct AuthServices<R: AuthStore> {
    pub gateway: AuthGateway<R, R, R, R, R>,
    pub registration: Registration<R, R>,
    pub two_factor: TwoFactorSetup<R, R>,
    pub account: AccountService<R, R, R>,
    store: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R: AuthStore> AuthServices<R> {
    pub fn new(store: Arc<R>, config: AuthConfig) -> AuthResult<Self> {
        let config = Arc::new(config);
        let issuer = Arc::new(TokenIssuer::new(&config));

        // Hashed once here so lookup misses cost the same as hits.
        let decoy = Arc::new(StoredPassword::decoy(config.pepper())?);

        let breach_checker = if config.breach_check {
            let checker = BreachChecker::new(BREACH_CHECK_TIMEOUT)
                .map_err(|e| AuthError::Internal(format!("breach checker: {e}")))?;
            Some(Arc::new(checker))
        } else {
            None
        };

        let verifier =
            CredentialVerifier::new(store.clone(), store.clone(), decoy, config.clone());
        let sessions = SessionTracker::new(store.clone(), config.clone());

        Ok(Self {
            gateway: AuthGateway::new(
                verifier,
                sessions,
                store.clone(),
                store.clone(),
                issuer,
                config.clone(),
            ),
            registration: Registration::new(
                store.clone(),
                store.clone(),
                breach_checker.clone(),
                config.clone(),
            ),
            two_factor: TwoFactorSetup::new(store.clone(), store.clone(), config.clone()),
            account: AccountService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                breach_checker,
                config.clone(),
            ),
            store,
            config,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        self.gateway.issuer()
    }

    /// Delete expired sessions, refresh tokens and challenges.
    pub async fn purge_expired(&self) -> AuthResult<PurgeReport> {
        let now = Utc::now();
        let report = PurgeReport {
            sessions: SessionRepository::delete_expired(&*self.store, now).await?,
            refresh_tokens: RefreshTokenRepository::delete_expired(&*self.store, now).await?,
            challenges: ChallengeRepository::delete_expired(&*self.store, now).await?,
        };

        tracing::info!(
            sessions = report.sessions,
            refresh_tokens = report.refresh_tokens,
            challenges = report.challenges,
            "Purged expired auth records"
        );
        Ok(report)
    }
}
