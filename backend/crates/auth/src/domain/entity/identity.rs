//! Identity Entity
//!
//! A person who can sign in. Secrets live on the credential record.

use chrono::{DateTime, Utc};
use kernel::id::{IdentityId, TenantId};

use crate::domain::value_object::{email::Email, role::Role};

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: IdentityId,
    pub tenant_id: TenantId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub active: bool,
    pub two_factor_enabled: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(
        tenant_id: TenantId,
        email: Email,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: IdentityId::new(),
            tenant_id,
            email,
            first_name: first_name.into(),
            last_name: last_name.into(),
            role,
            active: true,
            two_factor_enabled: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    pub fn set_two_factor(&mut self, enabled: bool) {
        self.two_factor_enabled = enabled;
        self.updated_at = Utc::now();
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.updated_at = Utc::now();
    }
}
