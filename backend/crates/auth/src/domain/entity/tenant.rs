use chrono::{DateTime, Utc};
use kernel::id::TenantId;

/// Organisation that owns identities. One is created per registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TenantId::new(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
