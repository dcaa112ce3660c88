use chrono::{DateTime, Duration, Utc};
use kernel::id::IdentityId;

use crate::domain::value_object::token_digest::TokenDigest;

/// Pending second-factor step. Handed out instead of tokens when the identity
/// has 2FA enabled; exchanged exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub token_hash: TokenDigest,
    pub identity_id: IdentityId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    pub fn new(raw_token: &str, identity_id: IdentityId, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            token_hash: TokenDigest::of(raw_token),
            identity_id,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
