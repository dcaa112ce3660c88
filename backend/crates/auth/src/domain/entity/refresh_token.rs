use chrono::{DateTime, Duration, Utc};
use kernel::id::{IdentityId, SessionId};

use crate::domain::value_object::token_digest::TokenDigest;

/// Server-side record of an issued refresh token. The raw token is never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshToken {
    pub token_hash: TokenDigest,
    pub identity_id: IdentityId,
    pub session_id: Option<SessionId>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl RefreshToken {
    pub fn new(
        raw_token: &str,
        identity_id: IdentityId,
        session_id: Option<SessionId>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            token_hash: TokenDigest::of(raw_token),
            identity_id,
            session_id,
            issued_at: now,
            expires_at: now + ttl,
            revoked: false,
        }
    }

    /// Never outlive `limit`.
    pub fn expiring_by(mut self, limit: DateTime<Utc>) -> Self {
        self.expires_at = self.expires_at.min(limit);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
