//! Domain Layer
//!
//! Contains entities, value objects, and repository traits.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    challenge::Challenge, credential::Credential, identity::Identity,
    refresh_token::RefreshToken, session::Session, tenant::Tenant,
};
pub use repository::{
    AuthStore, ChallengeRepository, CredentialRepository, IdentityRepository,
    RefreshTokenRepository, RegistrationRepository, RepoResult, RepositoryError,
    SessionRepository, TenantRepository,
};
