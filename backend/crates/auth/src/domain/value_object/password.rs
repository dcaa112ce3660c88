//! Password value objects
//!
//! Thin domain wrappers over `platform::password` that translate its errors
//! into [`AuthError`].

use platform::password::{
    BreachChecker, ClearTextPassword, HashedPassword, PasswordHashError, PasswordPolicyError,
};
use std::fmt;

use crate::error::{AuthError, AuthResult};

/// Password as typed by the user. Zeroized on drop.
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// A *new* password (registration, change). Policy is enforced.
    pub fn new(raw: String) -> AuthResult<Self> {
        ClearTextPassword::new(raw)
            .map(Self)
            .map_err(|e| AuthError::PasswordPolicy(e.to_string()))
    }

    /// A password presented for verification. Never rejected here.
    pub fn for_login(raw: String) -> Self {
        Self(ClearTextPassword::for_verification(raw))
    }

    /// Rejects passwords found in the breach corpus. Lookup failures are
    /// logged and ignored.
    pub async fn reject_if_compromised(&self, checker: &BreachChecker) -> AuthResult<()> {
        match checker.is_compromised(&self.0).await {
            Ok(true) => Err(AuthError::PasswordPolicy(
                PasswordPolicyError::Compromised.to_string(),
            )),
            Ok(false) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "Breach check unavailable, accepting password");
                Ok(())
            }
        }
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

/// Argon2id PHC string as stored on a credential record.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredPassword(HashedPassword);

impl StoredPassword {
    pub fn from_raw(raw: &RawPassword, pepper: Option<&[u8]>) -> AuthResult<Self> {
        raw.0
            .hash(pepper)
            .map(Self)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Hash of a random secret, used to keep lookup misses as slow as hits.
    pub fn decoy(pepper: Option<&[u8]>) -> AuthResult<Self> {
        HashedPassword::decoy(pepper)
            .map(Self)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    pub fn from_phc_string(phc: impl Into<String>) -> AuthResult<Self> {
        HashedPassword::from_phc_string(phc)
            .map(Self)
            .map_err(|e: PasswordHashError| {
                AuthError::Internal(format!("stored password hash is unreadable: {e}"))
            })
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(&raw.0, pepper)
    }

    /// [`Self::from_raw`] on the blocking pool. Argon2 is CPU-bound.
    pub async fn hash_blocking(raw: RawPassword, pepper: Option<Vec<u8>>) -> AuthResult<Self> {
        tokio::task::spawn_blocking(move || Self::from_raw(&raw, pepper.as_deref()))
            .await
            .map_err(|e| AuthError::Internal(format!("password hashing task failed: {e}")))?
    }

    /// [`Self::verify`] on the blocking pool.
    pub async fn verify_blocking(self, raw: RawPassword, pepper: Option<Vec<u8>>) -> AuthResult<bool> {
        tokio::task::spawn_blocking(move || self.verify(&raw, pepper.as_deref()))
            .await
            .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))
    }
}

impl fmt::Debug for StoredPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}
