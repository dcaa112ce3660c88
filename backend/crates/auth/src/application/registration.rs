//! Registration Use Case
//!
//! Creates a tenant, its first (admin) identity and the credential record in
//! one atomic store write.

use std::sync::Arc;

use platform::password::BreachChecker;

use crate::application::config::AuthConfig;
use crate::domain::entity::{credential::Credential, identity::Identity, tenant::Tenant};
use crate::domain::repository::{IdentityRepository, RegistrationRepository, RepositoryError};
use crate::domain::value_object::{
    email::Email,
    password::{RawPassword, StoredPassword},
    role::Role,
};
use crate::error::{AuthError, AuthResult};

const MAX_NAME_LEN: usize = 100;

/// Registration input
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// Tenant name
    pub company: String,
}

pub struct Registration<I, W>
where
    I: IdentityRepository,
    W: RegistrationRepository,
{
    identity_repo: Arc<I>,
    registration_repo: Arc<W>,
    breach_checker: Option<Arc<BreachChecker>>,
    config: Arc<AuthConfig>,
}

impl<I, W> Registration<I, W>
where
    I: IdentityRepository,
    W: RegistrationRepository,
{
    pub fn new(
        identity_repo: Arc<I>,
        registration_repo: Arc<W>,
        breach_checker: Option<Arc<BreachChecker>>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            identity_repo,
            registration_repo,
            breach_checker,
            config,
        }
    }

    pub async fn register(&self, input: RegisterInput) -> AuthResult<Identity> {
        let email = Email::new(&input.email)?;
        let first_name = clean_name(&input.first_name, "first_name")?;
        let last_name = clean_name(&input.last_name, "last_name")?;

        if !self.identity_repo.find_by_email(&email).await?.is_empty() {
            return Err(AuthError::EmailTaken);
        }

        let password = RawPassword::new(input.password)?;
        if let Some(checker) = &self.breach_checker {
            password.reject_if_compromised(checker).await?;
        }
        let hash =
            StoredPassword::hash_blocking(password, self.config.password_pepper.clone()).await?;

        let company = input.company.trim();
        let tenant_name = if company.is_empty() {
            format!("{first_name} {last_name}").trim().to_string()
        } else {
            company.chars().take(MAX_NAME_LEN).collect()
        };
        let tenant = Tenant::new(tenant_name);
        let identity = Identity::new(tenant.id, email, first_name, last_name, Role::Admin);
        let credential = Credential::new(identity.id, hash);

        match self
            .registration_repo
            .register(&tenant, &identity, &credential)
            .await
        {
            Ok(()) => {}
            // Lost a race against another registration for the same email.
            Err(RepositoryError::Conflict) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            identity_id = %identity.id,
            tenant_id = %tenant.id,
            "Identity registered"
        );

        Ok(identity)
    }
}

fn clean_name(raw: &str, field: &str) -> AuthResult<String> {
    let name = raw.trim();
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AuthError::InvalidArgument(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(AuthError::InvalidArgument(format!(
            "{field} contains invalid characters"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::{CredentialRepository, TenantRepository};
    use crate::infra::memory::MemoryAuthStore;

    fn registration() -> (Registration<MemoryAuthStore, MemoryAuthStore>, Arc<MemoryAuthStore>) {
        let store = Arc::new(MemoryAuthStore::new());
        let registration = Registration::new(
            store.clone(),
            store.clone(),
            None,
            Arc::new(AuthConfig::development()),
        );
        (registration, store)
    }

    fn input(email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Mira".to_string(),
            last_name: "Novak".to_string(),
            company: "Novak Labs".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_tenant_admin_and_credential() {
        let (registration, store) = registration();
        let identity = registration
            .register(input("Mira@Novak.dev", "quiet-lantern-88"))
            .await
            .unwrap();

        assert_eq!(identity.email.as_str(), "mira@novak.dev");
        assert_eq!(identity.role, Role::Admin);
        assert!(identity.active);
        assert!(!identity.two_factor_enabled);

        let tenant = TenantRepository::get(&*store, &identity.tenant_id).await.unwrap();
        assert_eq!(tenant.name, "Novak Labs");

        let credential = CredentialRepository::get(&*store, &identity.id).await.unwrap();
        let login = RawPassword::for_login("quiet-lantern-88".to_string());
        assert!(credential.password.verify(&login, None));
        assert!(credential.totp_secret.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let (registration, _) = registration();
        registration
            .register(input("dup@example.com", "quiet-lantern-88"))
            .await
            .unwrap();
        let err = registration
            .register(input("DUP@example.com", "another-lantern-77"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_weak_password_and_bad_email() {
        let (registration, _) = registration();
        let weak = registration.register(input("a@example.com", "short")).await.unwrap_err();
        assert!(matches!(weak, AuthError::PasswordPolicy(_)));

        let bad = registration
            .register(input("not-an-email", "quiet-lantern-88"))
            .await
            .unwrap_err();
        assert!(matches!(bad, AuthError::InvalidArgument(_)));
    }
}
