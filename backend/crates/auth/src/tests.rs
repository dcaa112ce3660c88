//! Unit tests for Auth crate
//! Gateway flows run against the in-memory store.

#[cfg(test)]
mod support {
    use std::sync::Arc;

    use platform::client::ClientOrigin;

    use crate::application::gateway::{GrantType, IssuedTokens, TokenGrant};
    use crate::application::registration::RegisterInput;
    use crate::application::{AuthConfig, AuthServices};
    use crate::domain::entity::identity::Identity;
    use crate::domain::repository::AuthStore;
    use crate::error::AuthResult;
    use crate::infra::memory::MemoryAuthStore;

    pub use faulty::FaultyStore;

    pub const PASSWORD: &str = "granite-meadow-57";

    pub fn services() -> (Arc<AuthServices<MemoryAuthStore>>, Arc<MemoryAuthStore>) {
        services_with(AuthConfig::development())
    }

    pub fn services_with(
        config: AuthConfig,
    ) -> (Arc<AuthServices<MemoryAuthStore>>, Arc<MemoryAuthStore>) {
        let store = Arc::new(MemoryAuthStore::new());
        let services = AuthServices::new(store.clone(), config).unwrap();
        (Arc::new(services), store)
    }

    pub fn faulty_services(store: FaultyStore) -> (Arc<AuthServices<FaultyStore>>, Arc<FaultyStore>) {
        let store = Arc::new(store);
        let services = AuthServices::new(store.clone(), AuthConfig::development()).unwrap();
        (Arc::new(services), store)
    }

    pub async fn register<R: AuthStore>(services: &AuthServices<R>, email: &str) -> Identity {
        services
            .registration
            .register(RegisterInput {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                company: "Acme".to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn login<R: AuthStore>(
        services: &AuthServices<R>,
        email: &str,
        password: &str,
    ) -> AuthResult<TokenGrant> {
        services
            .gateway
            .create_token(
                GrantType::Password,
                email,
                password.to_string(),
                &ClientOrigin::default(),
            )
            .await
    }

    pub fn issued(grant: TokenGrant) -> IssuedTokens {
        match grant {
            TokenGrant::Issued(tokens) => tokens,
            other => panic!("expected tokens, got {other:?}"),
        }
    }

    /// In-memory store whose selected writes fail like a broken backend.
    mod faulty {
        use chrono::{DateTime, Utc};
        use kernel::id::{IdentityId, SessionId, TenantId};

        use crate::domain::entity::{
            challenge::Challenge, credential::Credential, identity::Identity,
            refresh_token::RefreshToken, session::Session, tenant::Tenant,
        };
        use crate::domain::repository::{
            ChallengeRepository, CredentialRepository, IdentityRepository, RefreshTokenRepository,
            RegistrationRepository, RepoResult, RepositoryError, SessionRepository,
            TenantRepository,
        };
        use crate::domain::value_object::{email::Email, token_digest::TokenDigest};
        use crate::infra::memory::MemoryAuthStore;

        #[derive(Default)]
        pub struct FaultyStore {
            pub inner: MemoryAuthStore,
            pub fail_session_create: bool,
            pub fail_identity_update: bool,
            pub fail_refresh_create: bool,
        }

        fn fail_if(flag: bool) -> RepoResult<()> {
            if flag {
                Err(RepositoryError::Backend("connection reset".to_string()))
            } else {
                Ok(())
            }
        }

        impl IdentityRepository for FaultyStore {
            async fn get(&self, id: &IdentityId) -> RepoResult<Identity> {
                IdentityRepository::get(&self.inner, id).await
            }

            async fn find_by_email(&self, email: &Email) -> RepoResult<Vec<Identity>> {
                self.inner.find_by_email(email).await
            }

            async fn create(&self, identity: &Identity) -> RepoResult<()> {
                IdentityRepository::create(&self.inner, identity).await
            }

            async fn update(&self, identity: &Identity) -> RepoResult<()> {
                fail_if(self.fail_identity_update)?;
                IdentityRepository::update(&self.inner, identity).await
            }
        }

        impl TenantRepository for FaultyStore {
            async fn get(&self, id: &TenantId) -> RepoResult<Tenant> {
                TenantRepository::get(&self.inner, id).await
            }

            async fn create(&self, tenant: &Tenant) -> RepoResult<()> {
                TenantRepository::create(&self.inner, tenant).await
            }
        }

        impl CredentialRepository for FaultyStore {
            async fn get(&self, identity_id: &IdentityId) -> RepoResult<Credential> {
                CredentialRepository::get(&self.inner, identity_id).await
            }

            async fn create(&self, credential: &Credential) -> RepoResult<()> {
                CredentialRepository::create(&self.inner, credential).await
            }

            async fn replace(&self, credential: &Credential) -> RepoResult<()> {
                self.inner.replace(credential).await
            }
        }

        impl RegistrationRepository for FaultyStore {
            async fn register(
                &self,
                tenant: &Tenant,
                identity: &Identity,
                credential: &Credential,
            ) -> RepoResult<()> {
                self.inner.register(tenant, identity, credential).await
            }
        }

        impl SessionRepository for FaultyStore {
            async fn create(&self, session: &Session) -> RepoResult<()> {
                fail_if(self.fail_session_create)?;
                SessionRepository::create(&self.inner, session).await
            }

            async fn get(&self, id: &SessionId) -> RepoResult<Session> {
                SessionRepository::get(&self.inner, id).await
            }

            async fn list_active(
                &self,
                identity_id: &IdentityId,
                limit: usize,
            ) -> RepoResult<Vec<Session>> {
                self.inner.list_active(identity_id, limit).await
            }

            async fn update(&self, session: &Session) -> RepoResult<()> {
                SessionRepository::update(&self.inner, session).await
            }

            async fn revoke_all_except(
                &self,
                identity_id: &IdentityId,
                keep: Option<&SessionId>,
            ) -> RepoResult<u64> {
                self.inner.revoke_all_except(identity_id, keep).await
            }

            async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
                SessionRepository::delete_expired(&self.inner, now).await
            }
        }

        impl RefreshTokenRepository for FaultyStore {
            async fn create(&self, token: &RefreshToken) -> RepoResult<()> {
                fail_if(self.fail_refresh_create)?;
                RefreshTokenRepository::create(&self.inner, token).await
            }

            async fn get(&self, token_hash: &TokenDigest) -> RepoResult<RefreshToken> {
                RefreshTokenRepository::get(&self.inner, token_hash).await
            }

            async fn revoke(&self, token_hash: &TokenDigest) -> RepoResult<bool> {
                self.inner.revoke(token_hash).await
            }

            async fn revoke_for_session(&self, session_id: &SessionId) -> RepoResult<u64> {
                self.inner.revoke_for_session(session_id).await
            }

            async fn revoke_for_identity(
                &self,
                identity_id: &IdentityId,
                keep_session: Option<&SessionId>,
            ) -> RepoResult<u64> {
                self.inner.revoke_for_identity(identity_id, keep_session).await
            }

            async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
                RefreshTokenRepository::delete_expired(&self.inner, now).await
            }
        }

        impl ChallengeRepository for FaultyStore {
            async fn create(&self, challenge: &Challenge) -> RepoResult<()> {
                ChallengeRepository::create(&self.inner, challenge).await
            }

            async fn consume(&self, token_hash: &TokenDigest) -> RepoResult<Challenge> {
                self.inner.consume(token_hash).await
            }

            async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
                ChallengeRepository::delete_expired(&self.inner, now).await
            }
        }
    }
}

#[cfg(test)]
mod login_tests {
    use super::support::*;
    use crate::application::gateway::{GrantType, TokenGrant};
    use crate::domain::repository::{IdentityRepository, RepositoryError};
    use crate::error::AuthError;
    use kernel::error::kind::ErrorKind;
    use platform::client::ClientOrigin;

    #[tokio::test]
    async fn test_login_issues_active_access_token() {
        let (services, _) = services();
        let identity = register(&services, "alice@example.com").await;

        let tokens = issued(login(&services, "alice@example.com", PASSWORD).await.unwrap());
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 900);
        assert!(tokens.session_id.is_some());
        assert!(tokens.identity.last_login_at.is_some());

        let result = services.gateway.introspect(&tokens.access_token);
        assert!(result.active);
        assert_eq!(result.sub, Some(identity.id.to_string()));
        assert_eq!(result.username.as_deref(), Some("alice@example.com"));
        assert_eq!(result.exp.unwrap() - result.iat.unwrap(), 900);
    }

    #[tokio::test]
    async fn test_only_password_grant_is_supported() {
        let (services, _) = services();
        register(&services, "grant@example.com").await;

        for grant in [GrantType::Unspecified, GrantType::RefreshToken, GrantType::ClientCredentials] {
            let err = services
                .gateway
                .create_token(grant, "grant@example.com", PASSWORD.to_string(), &ClientOrigin::default())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_are_identical() {
        let (services, _) = services();
        register(&services, "bob@example.com").await;

        let unknown = login(&services, "nobody@example.com", PASSWORD).await.unwrap_err();
        let wrong = login(&services, "bob@example.com", "wrong-password-1").await.unwrap_err();

        let (unknown, wrong) = (unknown.to_app_error(), wrong.to_app_error());
        assert_eq!(unknown.kind(), ErrorKind::Unauthenticated);
        assert_eq!(unknown.kind(), wrong.kind());
        assert_eq!(unknown.message(), wrong.message());
        assert_eq!(unknown.message(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_disabled_identity_needs_the_right_password_to_learn_it() {
        let (services, store) = services();
        let mut identity = register(&services, "carol@example.com").await;
        identity.set_active(false);
        IdentityRepository::update(&*store, &identity).await.unwrap();

        let right = login(&services, "carol@example.com", PASSWORD).await.unwrap_err();
        assert!(matches!(right, AuthError::AccountDisabled));
        assert_eq!(right.kind(), ErrorKind::PermissionDenied);

        let wrong = login(&services, "carol@example.com", "wrong-password-1").await.unwrap_err();
        assert_eq!(wrong.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn test_concurrent_logins_get_independent_tokens_and_sessions() {
        let (services, _) = services();
        let identity = register(&services, "dave@example.com").await;

        let (a, b) = tokio::join!(
            login(&services, "dave@example.com", PASSWORD),
            login(&services, "dave@example.com", PASSWORD),
        );
        let (a, b) = (issued(a.unwrap()), issued(b.unwrap()));

        assert_ne!(a.refresh_token, b.refresh_token);
        assert_ne!(a.session_id, b.session_id);

        let sessions = services.gateway.list_sessions(&identity.id, None).await.unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[tokio::test]
    async fn test_login_survives_session_and_last_login_write_failures() {
        let (services, _) = faulty_services(FaultyStore {
            fail_session_create: true,
            fail_identity_update: true,
            ..FaultyStore::default()
        });
        register(&services, "quinn@example.com").await;

        let tokens = issued(login(&services, "quinn@example.com", PASSWORD).await.unwrap());
        assert_eq!(tokens.session_id, None);
        assert!(services.gateway.introspect(&tokens.access_token).active);
    }

    #[tokio::test]
    async fn test_failed_token_write_leaves_no_session_behind() {
        let (services, _) = faulty_services(FaultyStore {
            fail_refresh_create: true,
            ..FaultyStore::default()
        });
        let identity = register(&services, "ruth@example.com").await;

        let err = login(&services, "ruth@example.com", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::Repository(RepositoryError::Backend(_))));

        let sessions = services.gateway.list_sessions(&identity.id, None).await.unwrap();
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_login_outcome_is_not_a_challenge_without_two_factor() {
        let (services, _) = services();
        register(&services, "erin@example.com").await;
        let grant = login(&services, "erin@example.com", PASSWORD).await.unwrap();
        assert!(matches!(grant, TokenGrant::Issued(_)));
    }
}

#[cfg(test)]
mod two_factor_tests {
    use super::support::*;
    use crate::application::gateway::TokenGrant;
    use crate::domain::entity::identity::Identity;
    use crate::domain::value_object::totp_secret::TotpSecret;
    use crate::error::AuthError;
    use crate::infra::memory::MemoryAuthStore;
    use crate::application::AuthServices;
    use platform::client::ClientOrigin;

    /// Registered identity with 2FA switched on, and its secret.
    async fn enrolled(services: &AuthServices<MemoryAuthStore>, email: &str) -> (Identity, TotpSecret) {
        let identity = register(services, email).await;
        let enrollment = services.two_factor.enable(&identity.id).await.unwrap();
        let secret = TotpSecret::from_base32(enrollment.secret).unwrap();
        let code = secret.current_code("PureCerts", email);
        services.two_factor.confirm(&identity.id, &code).await.unwrap();
        (identity, secret)
    }

    fn challenge(grant: TokenGrant) -> String {
        match grant {
            TokenGrant::ChallengeRequired { mfa_token, expires_in } => {
                assert_eq!(expires_in, 300);
                mfa_token
            }
            other => panic!("expected challenge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_two_factor_identity_never_gets_tokens_directly() {
        let (services, _) = services();
        enrolled(&services, "frank@example.com").await;

        let first = challenge(login(&services, "frank@example.com", PASSWORD).await.unwrap());
        let second = challenge(login(&services, "frank@example.com", PASSWORD).await.unwrap());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_challenge_exchange_issues_tokens_once() {
        let (services, _) = services();
        let (identity, secret) = enrolled(&services, "gina@example.com").await;
        let mfa_token = challenge(login(&services, "gina@example.com", PASSWORD).await.unwrap());
        let code = secret.current_code("PureCerts", "gina@example.com");

        let tokens = services
            .gateway
            .verify_second_factor(&mfa_token, &code, &ClientOrigin::default())
            .await
            .unwrap();
        assert_eq!(tokens.identity.id, identity.id);
        assert!(services.gateway.introspect(&tokens.access_token).active);

        let replay = services
            .gateway
            .verify_second_factor(&mfa_token, &code, &ClientOrigin::default())
            .await;
        assert!(matches!(replay, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_wrong_code_burns_the_challenge() {
        let (services, _) = services();
        let (_, secret) = enrolled(&services, "hank@example.com").await;
        let mfa_token = challenge(login(&services, "hank@example.com", PASSWORD).await.unwrap());

        let wrong = services
            .gateway
            .verify_second_factor(&mfa_token, "abcdef", &ClientOrigin::default())
            .await;
        assert!(matches!(wrong, Err(AuthError::InvalidTwoFactorCode)));

        let code = secret.current_code("PureCerts", "hank@example.com");
        let retry = services
            .gateway
            .verify_second_factor(&mfa_token, &code, &ClientOrigin::default())
            .await;
        assert!(matches!(retry, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_wrong_password_on_two_factor_identity_is_plain_rejection() {
        let (services, _) = services();
        enrolled(&services, "iris@example.com").await;
        let err = login(&services, "iris@example.com", "wrong-password-1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
}

#[cfg(test)]
mod token_lifecycle_tests {
    use super::support::*;
    use crate::application::AuthConfig;
    use crate::application::token_issuer::TokenIssuer;
    use crate::domain::repository::{RefreshTokenRepository, SessionRepository};
    use crate::domain::value_object::token_digest::TokenDigest;
    use crate::error::AuthError;
    use chrono::{Duration, Utc};
    use platform::client::ClientOrigin;

    #[tokio::test]
    async fn test_introspect_garbage_and_expired_is_inactive() {
        let (services, _) = services();
        let identity = register(&services, "jack@example.com").await;

        assert!(!services.gateway.introspect("garbage").active);
        assert!(!services.gateway.introspect("a.b.c").active);

        let issuer: &TokenIssuer = services.issuer();
        let expired = issuer
            .issue_access_at(&identity, None, Utc::now() - Duration::minutes(20))
            .unwrap();
        assert!(!services.gateway.introspect(&expired.token).active);
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_old_token_fails() {
        let (services, _) = services();
        register(&services, "kate@example.com").await;
        let first = issued(login(&services, "kate@example.com", PASSWORD).await.unwrap());
        let origin = ClientOrigin::default();

        let second = services
            .gateway
            .refresh_token(&first.refresh_token, &origin)
            .await
            .unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);
        assert_eq!(second.session_id, first.session_id);
        assert!(services.gateway.introspect(&second.access_token).active);

        let reused = services.gateway.refresh_token(&first.refresh_token, &origin).await;
        assert!(matches!(reused, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_replayed_refresh_token_revokes_the_whole_family() {
        let (services, _) = services();
        register(&services, "liam@example.com").await;
        let first = issued(login(&services, "liam@example.com", PASSWORD).await.unwrap());
        let origin = ClientOrigin::default();

        let second = services
            .gateway
            .refresh_token(&first.refresh_token, &origin)
            .await
            .unwrap();
        // Replay of the rotated token.
        assert!(services.gateway.refresh_token(&first.refresh_token, &origin).await.is_err());
        // The legitimate successor is gone too.
        let successor = services.gateway.refresh_token(&second.refresh_token, &origin).await;
        assert!(matches!(successor, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_fails_before_expiry() {
        let (services, _) = services();
        let identity = register(&services, "mona@example.com").await;
        let tokens = issued(login(&services, "mona@example.com", PASSWORD).await.unwrap());

        services.gateway.revoke_token(&tokens.refresh_token).await.unwrap();

        let refreshed = services
            .gateway
            .refresh_token(&tokens.refresh_token, &ClientOrigin::default())
            .await;
        assert!(matches!(refreshed, Err(AuthError::InvalidToken)));

        // Its session went with it.
        let sessions = services.gateway.list_sessions(&identity.id, None).await.unwrap();
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_revoke_with_access_token_ends_its_session() {
        let (services, _) = services();
        let identity = register(&services, "nina@example.com").await;
        let tokens = issued(login(&services, "nina@example.com", PASSWORD).await.unwrap());

        services.gateway.revoke_token(&tokens.access_token).await.unwrap();

        assert!(services.gateway.list_sessions(&identity.id, None).await.unwrap().is_empty());
        let refreshed = services
            .gateway
            .refresh_token(&tokens.refresh_token, &ClientOrigin::default())
            .await;
        assert!(refreshed.is_err());
    }

    #[tokio::test]
    async fn test_refresh_fails_once_its_session_expired() {
        let (services, _) = services_with(AuthConfig {
            session_ttl: std::time::Duration::from_secs(1),
            ..AuthConfig::development()
        });
        register(&services, "nora@example.com").await;
        let tokens = issued(login(&services, "nora@example.com", PASSWORD).await.unwrap());

        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;

        let refreshed = services
            .gateway
            .refresh_token(&tokens.refresh_token, &ClientOrigin::default())
            .await;
        assert!(matches!(refreshed, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_fails_once_its_session_was_revoked() {
        let (services, store) = services();
        register(&services, "otto@example.com").await;
        let tokens = issued(login(&services, "otto@example.com", PASSWORD).await.unwrap());

        let mut session = SessionRepository::get(&*store, &tokens.session_id.unwrap())
            .await
            .unwrap();
        session.revoke();
        SessionRepository::update(&*store, &session).await.unwrap();

        let refreshed = services
            .gateway
            .refresh_token(&tokens.refresh_token, &ClientOrigin::default())
            .await;
        assert!(matches!(refreshed, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_token_never_outlives_its_session() {
        let (services, store) = services_with(AuthConfig {
            session_ttl: std::time::Duration::from_secs(60),
            ..AuthConfig::development()
        });
        register(&services, "pia@example.com").await;
        let first = issued(login(&services, "pia@example.com", PASSWORD).await.unwrap());
        let session = SessionRepository::get(&*store, &first.session_id.unwrap())
            .await
            .unwrap();

        let record = RefreshTokenRepository::get(&*store, &TokenDigest::of(&first.refresh_token))
            .await
            .unwrap();
        assert!(record.expires_at <= session.expires_at);

        let second = services
            .gateway
            .refresh_token(&first.refresh_token, &ClientOrigin::default())
            .await
            .unwrap();
        let rotated = RefreshTokenRepository::get(&*store, &TokenDigest::of(&second.refresh_token))
            .await
            .unwrap();
        assert!(rotated.expires_at <= session.expires_at);
    }

    #[tokio::test]
    async fn test_revoke_unknown_token_succeeds() {
        let (services, _) = services();
        services.gateway.revoke_token("never-issued").await.unwrap();
    }

    #[tokio::test]
    async fn test_change_password_signs_out_refresh_tokens() {
        let (services, _) = services();
        let identity = register(&services, "omar@example.com").await;
        let tokens = issued(login(&services, "omar@example.com", PASSWORD).await.unwrap());

        services
            .account
            .change_password(&identity.id, PASSWORD.to_string(), "fresh-orchard-64".to_string())
            .await
            .unwrap();

        let refreshed = services
            .gateway
            .refresh_token(&tokens.refresh_token, &ClientOrigin::default())
            .await;
        assert!(refreshed.is_err());
        assert!(login(&services, "omar@example.com", PASSWORD).await.is_err());
        assert!(login(&services, "omar@example.com", "fresh-orchard-64").await.is_ok());
    }
}

#[cfg(test)]
mod session_tests {
    use super::support::*;
    use crate::domain::entity::session::Session;
    use crate::domain::repository::SessionRepository;
    use chrono::Duration;
    use platform::client::ClientOrigin;

    #[tokio::test]
    async fn test_list_limit_is_clamped() {
        let (services, _) = services();
        let identity = register(&services, "pia@example.com").await;
        for _ in 0..3 {
            login(&services, "pia@example.com", PASSWORD).await.unwrap();
        }

        for limit in [Some(0), Some(500), Some(-1), None] {
            let sessions = services.gateway.list_sessions(&identity.id, limit).await.unwrap();
            assert_eq!(sessions.len(), 3, "limit {limit:?}");
        }
        let one = services.gateway.list_sessions(&identity.id, Some(1)).await.unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_all_other_sessions_keeps_current() {
        let (services, _) = services();
        let identity = register(&services, "quin@example.com").await;
        let current = issued(login(&services, "quin@example.com", PASSWORD).await.unwrap());
        let other = issued(login(&services, "quin@example.com", PASSWORD).await.unwrap());

        let revoked = services
            .gateway
            .revoke_all_other_sessions(&identity.id, current.session_id.as_ref())
            .await
            .unwrap();
        assert_eq!(revoked, 1);

        let left = services.gateway.list_sessions(&identity.id, None).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(Some(left[0].id), current.session_id);

        let origin = ClientOrigin::default();
        assert!(services.gateway.refresh_token(&other.refresh_token, &origin).await.is_err());
        assert!(services.gateway.refresh_token(&current.refresh_token, &origin).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_session_of_someone_else_is_not_found() {
        let (services, _) = services();
        register(&services, "ray@example.com").await;
        let stranger = register(&services, "sue@example.com").await;
        let tokens = issued(login(&services, "ray@example.com", PASSWORD).await.unwrap());

        let err = services
            .gateway
            .revoke_session(&stranger.id, tokens.session_id.as_ref().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kernel::error::kind::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (services, store) = services();
        let identity = register(&services, "tom@example.com").await;
        let stale = Session::new(identity.id, &ClientOrigin::default(), Duration::seconds(-5));
        SessionRepository::create(&*store, &stale).await.unwrap();

        let report = services.purge_expired().await.unwrap();
        assert_eq!(report.sessions, 1);
        assert_eq!(report.refresh_tokens, 0);
        assert_eq!(report.challenges, 0);
    }
}

#[cfg(test)]
mod router_tests {
    use super::support::*;
    use crate::presentation::router::auth_router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn call(app: axum::Router, path: &str, body: Value, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = app
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_register_login_and_fetch_current_user() {
        let (services, _) = services();
        let app = auth_router(services);

        let (status, created) = call(
            app.clone(),
            "/purecerts.v1.UserService/CreateUser",
            json!({
                "email": "uma@example.com",
                "password": PASSWORD,
                "firstName": "Uma",
                "last_name": "Reyes",
                "company": "Reyes Ltd"
            }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["user"]["role"], "ROLE_ADMIN");
        assert_eq!(created["user"]["lastName"], "Reyes");

        let (status, tokens) = call(
            app.clone(),
            "/purecerts.v1.TokenService/CreateToken",
            json!({ "grantType": 1, "username": "uma@example.com", "password": PASSWORD }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tokens["tokenType"], "Bearer");
        assert_eq!(tokens["expiresIn"], 900);
        assert_eq!(tokens["mfaRequired"], false);
        let access = tokens["accessToken"].as_str().unwrap().to_string();

        let (status, me) = call(
            app.clone(),
            "/purecerts.v1.UserService/GetCurrentUser",
            json!({}),
            Some(&access),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["user"]["email"], "uma@example.com");

        let (status, sessions) = call(
            app,
            "/purecerts.v1.SessionService/ListSessions",
            json!({ "limit": 0 }),
            Some(&access),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sessions["sessions"].as_array().unwrap().len(), 1);
        assert_eq!(sessions["sessions"][0]["current"], true);
    }

    #[tokio::test]
    async fn test_bad_credentials_map_to_unauthenticated() {
        let (services, _) = services();
        register(&services, "vic@example.com").await;
        let app = auth_router(services);

        let (status, body) = call(
            app,
            "/purecerts.v1.TokenService/CreateToken",
            json!({ "grant_type": "GRANT_TYPE_PASSWORD", "username": "vic@example.com", "password": "nope-nope-1" }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthenticated");
        assert_eq!(body["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_protected_routes_need_a_bearer_token() {
        let (services, _) = services();
        let app = auth_router(services);

        let (status, _) = call(
            app.clone(),
            "/purecerts.v1.UserService/GetCurrentUser",
            json!({}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(
            app,
            "/purecerts.v1.SessionService/ListSessions",
            json!({}),
            Some("not-a-token"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_introspect_garbage_over_http() {
        let (services, _) = services();
        let app = auth_router(services);

        let (status, body) = call(
            app,
            "/purecerts.v1.TokenService/IntrospectToken",
            json!({ "token": "garbage" }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "active": false }));
    }
}
