use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Tenant-scoped role. Stored as `i16`, carried in tokens as the lowercase code.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum Role {
    #[display("owner")]
    Owner = 1,
    #[display("admin")]
    Admin = 2,
    #[display("operator")]
    Operator = 3,
    #[default]
    #[display("viewer")]
    Viewer = 4,
}

impl Role {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        use Role::*;
        match self {
            Owner => "owner",
            Admin => "admin",
            Operator => "operator",
            Viewer => "viewer",
        }
    }

    /// Enum name used by RPC clients, e.g. `ROLE_ADMIN`.
    #[inline]
    pub const fn wire_name(&self) -> &'static str {
        use Role::*;
        match self {
            Owner => "ROLE_OWNER",
            Admin => "ROLE_ADMIN",
            Operator => "ROLE_OPERATOR",
            Viewer => "ROLE_VIEWER",
        }
    }

    pub fn from_id(id: i16) -> Option<Self> {
        use Role::*;
        match id {
            1 => Some(Owner),
            2 => Some(Admin),
            3 => Some(Operator),
            4 => Some(Viewer),
            _ => None,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        use Role::*;
        match code {
            "owner" => Some(Owner),
            "admin" => Some(Admin),
            "operator" => Some(Operator),
            "viewer" => Some(Viewer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_id_roundtrip() {
        for role in [Role::Owner, Role::Admin, Role::Operator, Role::Viewer] {
            assert_eq!(Role::from_id(role.id()), Some(role));
            assert_eq!(Role::from_code(role.code()), Some(role));
            assert_eq!(role.to_string(), role.code());
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_code("super_admin"), None);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(Role::Admin.wire_name(), "ROLE_ADMIN");
        assert_eq!(Role::Viewer.wire_name(), "ROLE_VIEWER");
    }

    #[test]
    fn test_role_serde_matches_code() {
        assert_eq!(serde_json::to_string(&Role::Operator).unwrap(), "\"operator\"");
        let role: Role = serde_json::from_str("\"owner\"").unwrap();
        assert_eq!(role, Role::Owner);
    }
}
