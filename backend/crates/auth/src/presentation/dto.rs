//! API DTOs (Data Transfer Objects)
//!
//! Connect-style JSON. Requests accept camelCase and snake_case field names,
//! responses are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::gateway::{GrantType, IssuedTokens, TokenGrant};
use crate::application::introspection::Introspection;
use crate::domain::entity::{identity::Identity, session::Session};
use crate::domain::value_object::totp_secret::TotpEnrollment;

/// Body of calls that return nothing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Empty {}

// ============================================================================
// Shared
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub tenant_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// `ROLE_ADMIN` etc.
    pub role: &'static str,
    pub active: bool,
    pub two_factor_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Identity> for UserDto {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.to_string(),
            tenant_id: identity.tenant_id.to_string(),
            email: identity.email.to_string(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            role: identity.role.wire_name(),
            active: identity.active,
            two_factor_enabled: identity.two_factor_enabled,
            last_login_at: identity.last_login_at,
            created_at: identity.created_at,
        }
    }
}

// ============================================================================
// TokenService
// ============================================================================

/// Enum number (`1`) or name (`"GRANT_TYPE_PASSWORD"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GrantTypeValue {
    Number(i64),
    Name(String),
}

impl GrantTypeValue {
    pub fn resolve(&self) -> Option<GrantType> {
        match self {
            GrantTypeValue::Number(n) => GrantType::from_number(*n),
            GrantTypeValue::Name(name) => GrantType::from_name(name),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    #[serde(default, alias = "grant_type")]
    pub grant_type: Option<GrantTypeValue>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Either a token bundle or a pending second factor.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserDto>,
    pub mfa_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mfa_token: Option<String>,
}

impl From<IssuedTokens> for TokenResponse {
    fn from(tokens: IssuedTokens) -> Self {
        Self {
            user: Some(UserDto::from(&tokens.identity)),
            access_token: Some(tokens.access_token),
            token_type: Some(tokens.token_type),
            expires_in: Some(tokens.expires_in),
            refresh_token: Some(tokens.refresh_token),
            mfa_required: false,
            mfa_token: None,
        }
    }
}

impl From<TokenGrant> for TokenResponse {
    fn from(grant: TokenGrant) -> Self {
        match grant {
            TokenGrant::Issued(tokens) => tokens.into(),
            TokenGrant::ChallengeRequired {
                mfa_token,
                expires_in,
            } => Self {
                expires_in: Some(expires_in),
                mfa_required: true,
                mfa_token: Some(mfa_token),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectTokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectTokenResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl From<Introspection> for IntrospectTokenResponse {
    fn from(i: Introspection) -> Self {
        Self {
            active: i.active,
            sub: i.sub,
            username: i.username,
            tenant_id: i.tenant_id,
            role: i.role,
            exp: i.exp,
            iat: i.iat,
            token_type: i.token_type,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[serde(default, alias = "refresh_token")]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevokeTokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTwoFactorRequest {
    #[serde(default, alias = "mfa_token")]
    pub mfa_token: String,
    #[serde(default)]
    pub code: String,
}

// ============================================================================
// UserService
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default, alias = "first_name")]
    pub first_name: String,
    #[serde(default, alias = "last_name")]
    pub last_name: String,
    #[serde(default)]
    pub company: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user: UserDto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default, alias = "current_password")]
    pub current_password: String,
    #[serde(default, alias = "new_password")]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enable2FAResponse {
    pub secret: String,
    pub otpauth_url: String,
    /// base64 PNG
    pub qr_code: String,
}

impl From<TotpEnrollment> for Enable2FAResponse {
    fn from(e: TotpEnrollment) -> Self {
        Self {
            secret: e.secret,
            otpauth_url: e.otpauth_url,
            qr_code: e.qr_code,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwoFactorCodeRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Confirm2FAResponse {
    pub enabled: bool,
}

// ============================================================================
// SessionService
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListSessionsRequest {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// The session the caller's access token belongs to
    pub current: bool,
}

impl SessionDto {
    pub fn new(session: Session, current: bool) -> Self {
        Self {
            id: session.id.to_string(),
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            created_at: session.created_at,
            last_active_at: session.last_active_at,
            expires_at: session.expires_at,
            current,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeSessionRequest {
    #[serde(default, alias = "session_id")]
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevokeAllOtherSessionsResponse {
    pub revoked: u64,
}
