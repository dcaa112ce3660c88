//! Credential Verifier
//!
//! Checks an email/password pair against stored identities. The password is
//! always verified first, against a decoy hash when there is nothing to
//! compare with, so the outcome of a lookup never shows in timing.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::entity::identity::Identity;
use crate::domain::repository::{CredentialRepository, IdentityRepository, RepositoryError};
use crate::domain::value_object::email::Email;
use crate::domain::value_object::password::{RawPassword, StoredPassword};
use crate::error::AuthResult;

#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Authenticated(Identity),
    InvalidCredentials,
    AccountDisabled,
    TwoFactorRequired(Identity),
}

pub struct CredentialVerifier<I, C>
where
    I: IdentityRepository,
    C: CredentialRepository,
{
    identity_repo: Arc<I>,
    credential_repo: Arc<C>,
    decoy: Arc<StoredPassword>,
    config: Arc<AuthConfig>,
}

impl<I, C> CredentialVerifier<I, C>
where
    I: IdentityRepository,
    C: CredentialRepository,
{
    pub fn new(
        identity_repo: Arc<I>,
        credential_repo: Arc<C>,
        decoy: Arc<StoredPassword>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            identity_repo,
            credential_repo,
            decoy,
            config,
        }
    }

    pub async fn verify(&self, email: &str, password: RawPassword) -> AuthResult<Verification> {
        let identity = match Email::new(email) {
            Ok(email) => self.lookup(&email).await?,
            Err(_) => None,
        };

        let stored = match &identity {
            Some(identity) => match self.credential_repo.get(&identity.id).await {
                Ok(credential) => Some(credential.password),
                Err(RepositoryError::NotFound) => {
                    tracing::warn!(identity_id = %identity.id, "Identity has no credential record");
                    None
                }
                Err(e) => return Err(e.into()),
            },
            None => None,
        };

        let matched = match stored {
            Some(hash) => self.check_password(hash, password).await?,
            None => {
                self.check_password((*self.decoy).clone(), password).await?;
                false
            }
        };

        let identity = match identity {
            Some(identity) if matched => identity,
            _ => return Ok(Verification::InvalidCredentials),
        };

        if !identity.active {
            return Ok(Verification::AccountDisabled);
        }
        if identity.two_factor_enabled {
            return Ok(Verification::TwoFactorRequired(identity));
        }
        Ok(Verification::Authenticated(identity))
    }

    pub(crate) fn identities(&self) -> &Arc<I> {
        &self.identity_repo
    }

    pub(crate) fn credentials(&self) -> &Arc<C> {
        &self.credential_repo
    }

    /// Exactly one match or nothing.
    async fn lookup(&self, email: &Email) -> AuthResult<Option<Identity>> {
        let mut matches = self.identity_repo.find_by_email(email).await?;
        match matches.len() {
            1 => Ok(matches.pop()),
            0 => Ok(None),
            n => {
                tracing::warn!(matches = n, "Email resolves to several identities, refusing login");
                Ok(None)
            }
        }
    }

    async fn check_password(&self, hash: StoredPassword, password: RawPassword) -> AuthResult<bool> {
        hash.verify_blocking(password, self.config.password_pepper.clone())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::credential::Credential;
    use crate::domain::value_object::role::Role;
    use crate::infra::memory::MemoryAuthStore;
    use kernel::id::TenantId;

    const PASSWORD: &str = "violet-harbor-42";

    async fn setup(active: bool, two_factor: bool) -> (CredentialVerifier<MemoryAuthStore, MemoryAuthStore>, Identity) {
        let config = Arc::new(AuthConfig::development());
        let store = Arc::new(MemoryAuthStore::new());

        let mut identity = Identity::new(
            TenantId::new(),
            Email::new("Dana@Example.com").unwrap(),
            "Dana",
            "Lee",
            Role::Viewer,
        );
        identity.active = active;
        identity.two_factor_enabled = two_factor;
        IdentityRepository::create(&*store, &identity).await.unwrap();

        let raw = RawPassword::new(PASSWORD.to_string()).unwrap();
        let credential = Credential::new(identity.id, StoredPassword::from_raw(&raw, None).unwrap());
        CredentialRepository::create(&*store, &credential).await.unwrap();

        let decoy = Arc::new(StoredPassword::decoy(None).unwrap());
        let verifier = CredentialVerifier::new(store.clone(), store, decoy, config);
        (verifier, identity)
    }

    fn login(password: &str) -> RawPassword {
        RawPassword::for_login(password.to_string())
    }

    #[tokio::test]
    async fn test_authenticates_with_normalised_email() {
        let (verifier, identity) = setup(true, false).await;
        let outcome = verifier.verify("  DANA@example.com ", login(PASSWORD)).await.unwrap();
        assert_eq!(outcome, Verification::Authenticated(identity));
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_the_same() {
        let (verifier, _) = setup(true, false).await;
        let unknown = verifier.verify("nobody@example.com", login(PASSWORD)).await.unwrap();
        let wrong = verifier.verify("dana@example.com", login("wrong-password")).await.unwrap();
        let garbage = verifier.verify("not-an-email", login(PASSWORD)).await.unwrap();
        assert_eq!(unknown, Verification::InvalidCredentials);
        assert_eq!(wrong, Verification::InvalidCredentials);
        assert_eq!(garbage, Verification::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_disabled_only_after_password_matches() {
        let (verifier, _) = setup(false, false).await;
        let right = verifier.verify("dana@example.com", login(PASSWORD)).await.unwrap();
        let wrong = verifier.verify("dana@example.com", login("wrong-password")).await.unwrap();
        assert_eq!(right, Verification::AccountDisabled);
        assert_eq!(wrong, Verification::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_two_factor_required() {
        let (verifier, identity) = setup(true, true).await;
        let outcome = verifier.verify("dana@example.com", login(PASSWORD)).await.unwrap();
        assert_eq!(outcome, Verification::TwoFactorRequired(identity));
    }
}
