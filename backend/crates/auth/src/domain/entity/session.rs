//! Session Entity
//!
//! Audit record of one successful login. Lives independently of the tokens
//! minted for it and normally outlasts the access token.

use chrono::{DateTime, Duration, Utc};
use kernel::id::{IdentityId, SessionId};
use platform::client::ClientOrigin;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub identity_id: IdentityId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl Session {
    pub fn new(identity_id: IdentityId, origin: &ClientOrigin, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            identity_id,
            ip_address: origin.ip_string(),
            user_agent: origin.user_agent.clone(),
            created_at: now,
            last_active_at: now,
            expires_at: now + ttl,
            revoked: false,
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    pub fn revoke(&mut self) {
        self.revoked = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let origin = ClientOrigin::new(Some("198.51.100.4".parse().unwrap()), Some("curl/8".into()));
        let mut session = Session::new(IdentityId::new(), &origin, Duration::days(7));

        assert_eq!(session.ip_address.as_deref(), Some("198.51.100.4"));
        assert_eq!(session.expires_at - session.created_at, Duration::days(7));
        assert!(session.is_active());
        assert!(!session.is_active_at(session.expires_at));

        session.revoke();
        assert!(!session.is_active());
    }
}
