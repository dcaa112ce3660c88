//! Two-Factor Setup Use Case
//!
//! Enrollment is two-step: `enable` stores a fresh secret without enforcing
//! it, `confirm` proves the authenticator works and switches enforcement on.

use std::sync::Arc;

use kernel::id::IdentityId;

use crate::application::config::AuthConfig;
use crate::domain::entity::identity::Identity;
use crate::domain::repository::{CredentialRepository, IdentityRepository, RepositoryError};
use crate::domain::value_object::totp_secret::{TotpEnrollment, TotpSecret};
use crate::error::{AuthError, AuthResult};

pub struct TwoFactorSetup<I, C>
where
    I: IdentityRepository,
    C: CredentialRepository,
{
    identity_repo: Arc<I>,
    credential_repo: Arc<C>,
    config: Arc<AuthConfig>,
}

impl<I, C> TwoFactorSetup<I, C>
where
    I: IdentityRepository,
    C: CredentialRepository,
{
    pub fn new(identity_repo: Arc<I>, credential_repo: Arc<C>, config: Arc<AuthConfig>) -> Self {
        Self {
            identity_repo,
            credential_repo,
            config,
        }
    }

    /// Start (or restart) enrollment with a new secret.
    pub async fn enable(&self, identity_id: &IdentityId) -> AuthResult<TotpEnrollment> {
        let identity = self.identity(identity_id).await?;
        if identity.two_factor_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }

        let credential = self.credential_repo.get(identity_id).await?;
        let secret = TotpSecret::generate();
        let enrollment = secret.enrollment(&self.config.totp_issuer, identity.email.as_str())?;

        self.credential_repo
            .replace(&credential.with_totp_secret(Some(secret)))
            .await?;

        tracing::info!(identity_id = %identity_id, "Two-factor enrollment started");
        Ok(enrollment)
    }

    pub async fn confirm(&self, identity_id: &IdentityId, code: &str) -> AuthResult<bool> {
        let mut identity = self.identity(identity_id).await?;
        if identity.two_factor_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }

        let credential = self.credential_repo.get(identity_id).await?;
        let secret = credential
            .totp_secret
            .as_ref()
            .ok_or(AuthError::TwoFactorNotSetup)?;
        if !secret.verify(code, &self.config.totp_issuer, identity.email.as_str())? {
            return Err(AuthError::InvalidTwoFactorCode);
        }

        identity.set_two_factor(true);
        self.identity_repo.update(&identity).await?;

        tracing::info!(identity_id = %identity_id, "Two-factor authentication enabled");
        Ok(true)
    }

    pub async fn disable(&self, identity_id: &IdentityId, code: &str) -> AuthResult<()> {
        let mut identity = self.identity(identity_id).await?;
        if !identity.two_factor_enabled {
            return Err(AuthError::TwoFactorNotSetup);
        }

        let credential = self.credential_repo.get(identity_id).await?;
        let secret = credential
            .totp_secret
            .as_ref()
            .ok_or(AuthError::TwoFactorNotSetup)?;
        if !secret.verify(code, &self.config.totp_issuer, identity.email.as_str())? {
            return Err(AuthError::InvalidTwoFactorCode);
        }

        self.credential_repo
            .replace(&credential.with_totp_secret(None))
            .await?;
        identity.set_two_factor(false);
        self.identity_repo.update(&identity).await?;

        tracing::info!(identity_id = %identity_id, "Two-factor authentication disabled");
        Ok(())
    }

    async fn identity(&self, identity_id: &IdentityId) -> AuthResult<Identity> {
        match self.identity_repo.get(identity_id).await {
            Ok(identity) => Ok(identity),
            Err(RepositoryError::NotFound) => Err(AuthError::IdentityNotFound),
            Err(e) => Err(e.into()),
        }
    }
}
