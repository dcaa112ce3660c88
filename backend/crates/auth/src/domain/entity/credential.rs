//! Credential Entity
//!
//! Secrets for one identity, kept apart from the profile so nothing outside
//! the verifier and the 2FA use cases ever loads them.

use chrono::{DateTime, Utc};
use kernel::id::IdentityId;

use crate::domain::value_object::{password::StoredPassword, totp_secret::TotpSecret};

#[derive(Debug, Clone)]
pub struct Credential {
    pub identity_id: IdentityId,
    pub password: StoredPassword,
    /// Present once enrollment has started. Only enforced when the identity
    /// has `two_factor_enabled`.
    pub totp_secret: Option<TotpSecret>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(identity_id: IdentityId, password: StoredPassword) -> Self {
        let now = Utc::now();
        Self {
            identity_id,
            password,
            totp_secret: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// New record with a different password. The TOTP secret carries over.
    pub fn with_password(&self, password: StoredPassword) -> Self {
        let now = Utc::now();
        Self {
            identity_id: self.identity_id,
            password,
            totp_secret: self.totp_secret.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_totp_secret(&self, secret: Option<TotpSecret>) -> Self {
        Self {
            totp_secret: secret,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
