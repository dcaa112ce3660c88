//! Account Use Cases
//!
//! Profile lookup and password change for an authenticated identity.

use std::sync::Arc;

use kernel::id::IdentityId;
use platform::password::BreachChecker;

use crate::application::config::AuthConfig;
use crate::domain::entity::identity::Identity;
use crate::domain::repository::{
    CredentialRepository, IdentityRepository, RefreshTokenRepository, RepositoryError,
};
use crate::domain::value_object::password::{RawPassword, StoredPassword};
use crate::error::{AuthError, AuthResult};

pub struct AccountService<I, C, R>
where
    I: IdentityRepository,
    C: CredentialRepository,
    R: RefreshTokenRepository,
{
    identity_repo: Arc<I>,
    credential_repo: Arc<C>,
    refresh_repo: Arc<R>,
    breach_checker: Option<Arc<BreachChecker>>,
    config: Arc<AuthConfig>,
}

impl<I, C, R> AccountService<I, C, R>
where
    I: IdentityRepository,
    C: CredentialRepository,
    R: RefreshTokenRepository,
{
    pub fn new(
        identity_repo: Arc<I>,
        credential_repo: Arc<C>,
        refresh_repo: Arc<R>,
        breach_checker: Option<Arc<BreachChecker>>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            identity_repo,
            credential_repo,
            refresh_repo,
            breach_checker,
            config,
        }
    }

    pub async fn current_user(&self, identity_id: &IdentityId) -> AuthResult<Identity> {
        match self.identity_repo.get(identity_id).await {
            Ok(identity) => Ok(identity),
            Err(RepositoryError::NotFound) => Err(AuthError::IdentityNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the credential record and signs out every refresh token.
    pub async fn change_password(
        &self,
        identity_id: &IdentityId,
        current: String,
        new: String,
    ) -> AuthResult<()> {
        let credential = self.credential_repo.get(identity_id).await?;

        let current = RawPassword::for_login(current);
        let matched = credential
            .password
            .clone()
            .verify_blocking(current, self.config.password_pepper.clone())
            .await?;
        if !matched {
            return Err(AuthError::InvalidCredentials);
        }

        let new = RawPassword::new(new)?;
        if let Some(checker) = &self.breach_checker {
            new.reject_if_compromised(checker).await?;
        }
        let hash = StoredPassword::hash_blocking(new, self.config.password_pepper.clone()).await?;

        self.credential_repo
            .replace(&credential.with_password(hash))
            .await?;
        let revoked = self
            .refresh_repo
            .revoke_for_identity(identity_id, None)
            .await?;

        tracing::info!(identity_id = %identity_id, revoked, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{credential::Credential, refresh_token::RefreshToken};
    use crate::domain::value_object::{email::Email, role::Role, token_digest::TokenDigest};
    use crate::infra::memory::MemoryAuthStore;
    use kernel::id::TenantId;

    #[tokio::test]
    async fn test_change_password() {
        let store = Arc::new(MemoryAuthStore::new());
        let identity = Identity::new(
            TenantId::new(),
            Email::new("pw@example.com").unwrap(),
            "Pat",
            "Wu",
            Role::Viewer,
        );
        IdentityRepository::create(&*store, &identity).await.unwrap();
        let raw = RawPassword::new("first-garden-19".to_string()).unwrap();
        let credential = Credential::new(identity.id, StoredPassword::from_raw(&raw, None).unwrap());
        CredentialRepository::create(&*store, &credential).await.unwrap();
        let token = RefreshToken::new("refresh-raw", identity.id, None, chrono::Duration::days(7));
        RefreshTokenRepository::create(&*store, &token).await.unwrap();

        let service = AccountService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            None,
            Arc::new(AuthConfig::development()),
        );

        let wrong = service
            .change_password(&identity.id, "not-it".into(), "second-garden-20".into())
            .await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        service
            .change_password(&identity.id, "first-garden-19".into(), "second-garden-20".into())
            .await
            .unwrap();

        let updated = CredentialRepository::get(&*store, &identity.id).await.unwrap();
        assert!(updated.password.verify(&RawPassword::for_login("second-garden-20".into()), None));
        assert!(!updated.password.verify(&RawPassword::for_login("first-garden-19".into()), None));

        let token = RefreshTokenRepository::get(&*store, &TokenDigest::of("refresh-raw"))
            .await
            .unwrap();
        assert!(token.revoked);
    }

    #[tokio::test]
    async fn test_current_user_missing() {
        let store = Arc::new(MemoryAuthStore::new());
        let service = AccountService::new(
            store.clone(),
            store.clone(),
            store,
            None,
            Arc::new(AuthConfig::development()),
        );
        assert!(matches!(
            service.current_user(&IdentityId::new()).await,
            Err(AuthError::IdentityNotFound)
        ));
    }
}
