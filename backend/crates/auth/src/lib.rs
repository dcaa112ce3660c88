//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Credential verifier, token issuer, session tracker,
//!   introspection and the gateway that orchestrates them
//! - `infra/` - PostgreSQL and in-memory repository implementations
//! - `presentation/` - Connect-style HTTP handlers, DTOs, router
//!
//! ## Features
//! - Email/password login issuing HS256 access tokens and opaque refresh tokens
//! - Refresh token rotation with replay detection
//! - TOTP second factor with single-use challenge tokens
//! - One session record per login, listable and revocable
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (NIST SP 800-63B compliant)
//! - Password verified before any account-state branch; lookup misses are
//!   checked against a decoy hash
//! - Refresh and challenge tokens stored only as SHA-256 digests

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::{AuthServices, PurgeReport, config::AuthConfig};
pub use error::{AuthError, AuthResult};
pub use infra::{MemoryAuthStore, PgAuthStore};
pub use presentation::router::auth_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
