//! Token Issuer
//!
//! Mints HS256 access tokens and opaque refresh tokens, and validates access
//! tokens. Validation failures are reduced to a [`TokenRejection`] that is
//! logged but never shown to clients.

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind as JwtErrorKind,
};
use kernel::id::{IdentityId, SessionId, TenantId};
use serde::{Deserialize, Serialize};

use crate::application::config::AuthConfig;
use crate::domain::entity::identity::Identity;
use crate::domain::value_object::role::Role;
use crate::error::{AuthError, AuthResult};

/// Refresh and challenge tokens: 32 random bytes.
pub const OPAQUE_TOKEN_BYTES: usize = 32;

pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Access token claims. Role and tenant are frozen at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub tenant_id: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    /// Session recorded for the login that produced this token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

impl AccessClaims {
    pub fn identity_id(&self) -> Option<IdentityId> {
        IdentityId::parse_str(&self.sub).ok()
    }

    pub fn tenant(&self) -> Option<TenantId> {
        TenantId::parse_str(&self.tenant_id).ok()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.sid.as_deref().and_then(|s| SessionId::parse_str(s).ok())
    }

    pub fn role(&self) -> Option<Role> {
        Role::from_code(&self.role)
    }
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub claims: AccessClaims,
    /// Seconds until `exp`
    pub expires_in: i64,
}

/// Why a token failed validation. For logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Malformed,
    Expired,
    BadSignature,
    WrongAlgorithm,
    MissingClaim,
    Other,
}

impl From<&jsonwebtoken::errors::Error> for TokenRejection {
    fn from(err: &jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            JwtErrorKind::ExpiredSignature => TokenRejection::Expired,
            JwtErrorKind::InvalidSignature => TokenRejection::BadSignature,
            JwtErrorKind::InvalidAlgorithm | JwtErrorKind::InvalidAlgorithmName => {
                TokenRejection::WrongAlgorithm
            }
            JwtErrorKind::MissingRequiredClaim(_) => TokenRejection::MissingClaim,
            JwtErrorKind::InvalidToken
            | JwtErrorKind::Base64(_)
            | JwtErrorKind::Json(_)
            | JwtErrorKind::Utf8(_) => TokenRejection::Malformed,
            _ => TokenRejection::Other,
        }
    }
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(&config.token_secret),
            decoding_key: DecodingKey::from_secret(&config.token_secret),
            validation,
            access_ttl: AuthConfig::chrono(config.access_token_ttl),
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access(
        &self,
        identity: &Identity,
        session_id: Option<SessionId>,
    ) -> AuthResult<AccessToken> {
        self.issue_access_at(identity, session_id, Utc::now())
    }

    /// `iat = now`, `exp = now + access TTL`.
    pub fn issue_access_at(
        &self,
        identity: &Identity,
        session_id: Option<SessionId>,
        now: DateTime<Utc>,
    ) -> AuthResult<AccessToken> {
        let iat = now.timestamp();
        let exp = (now + self.access_ttl).timestamp();

        let claims = AccessClaims {
            sub: identity.id.to_string(),
            tenant_id: identity.tenant_id.to_string(),
            email: identity.email.to_string(),
            role: identity.role.code().to_string(),
            iat,
            exp,
            sid: session_id.map(|id| id.to_string()),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign access token: {e}")))?;

        Ok(AccessToken {
            token,
            expires_in: exp - iat,
            claims,
        })
    }

    /// Fresh opaque refresh token. Uniqueness comes from the RNG.
    pub fn issue_refresh(&self) -> String {
        platform::crypto::opaque_token(OPAQUE_TOKEN_BYTES)
    }

    pub fn validate(&self, token: &str) -> Result<AccessClaims, TokenRejection> {
        match decode::<AccessClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => {
                let rejection = TokenRejection::from(&e);
                tracing::debug!(reason = ?rejection, error = %e, "Access token rejected");
                Err(rejection)
            }
        }
    }
}
