//! Introspection Service
//!
//! Stateless check of an access token. Never fails: anything that does not
//! validate is reported as inactive.

use std::sync::Arc;

use crate::application::token_issuer::{AccessClaims, TOKEN_TYPE_BEARER, TokenIssuer};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Introspection {
    pub active: bool,
    pub sub: Option<String>,
    /// Email of the identity
    pub username: Option<String>,
    pub tenant_id: Option<String>,
    pub role: Option<String>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub token_type: Option<String>,
}

impl Introspection {
    pub fn inactive() -> Self {
        Self::default()
    }
}

impl From<AccessClaims> for Introspection {
    fn from(claims: AccessClaims) -> Self {
        Self {
            active: true,
            sub: Some(claims.sub),
            username: Some(claims.email),
            tenant_id: Some(claims.tenant_id),
            role: Some(claims.role),
            exp: Some(claims.exp),
            iat: Some(claims.iat),
            token_type: Some(TOKEN_TYPE_BEARER.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct IntrospectionService {
    issuer: Arc<TokenIssuer>,
}

impl IntrospectionService {
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }

    pub fn introspect(&self, token: &str) -> Introspection {
        match self.issuer.validate(token.trim()) {
            Ok(claims) => claims.into(),
            Err(_) => Introspection::inactive(),
        }
    }
}
