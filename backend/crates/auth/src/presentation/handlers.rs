//! HTTP Handlers
//!
//! One handler per Connect method. Every method is a unary POST.

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use kernel::id::SessionId;

use crate::application::AuthServices;
use crate::application::gateway::GrantType;
use crate::application::registration::RegisterInput;
use crate::domain::repository::AuthStore;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    ChangePasswordRequest, Confirm2FAResponse, CreateTokenRequest, CreateUserRequest, Empty,
    Enable2FAResponse, IntrospectTokenRequest, IntrospectTokenResponse, ListSessionsRequest,
    ListSessionsResponse, RefreshTokenRequest, RevokeAllOtherSessionsResponse,
    RevokeSessionRequest, RevokeTokenRequest, SessionDto, TokenResponse, TwoFactorCodeRequest,
    UserDto, UserResponse, VerifyTwoFactorRequest,
};
use crate::presentation::middleware::{AuthContext, RequestOrigin};

/// Shared state for auth handlers
pub type AuthAppState<R> = Arc<AuthServices<R>>;

// ============================================================================
// TokenService
// ============================================================================

/// POST /purecerts.v1.TokenService/CreateToken
pub async fn create_token<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    RequestOrigin(origin): RequestOrigin,
    Json(req): Json<CreateTokenRequest>,
) -> AuthResult<Json<TokenResponse>> {
    let grant_type = match &req.grant_type {
        Some(value) => value
            .resolve()
            .ok_or_else(|| AuthError::InvalidArgument("unknown grant_type".to_string()))?,
        None => GrantType::Unspecified,
    };

    let grant = state
        .gateway
        .create_token(grant_type, &req.username, req.password, &origin)
        .await?;

    Ok(Json(grant.into()))
}

/// POST /purecerts.v1.TokenService/IntrospectToken
pub async fn introspect_token<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<IntrospectTokenRequest>,
) -> Json<IntrospectTokenResponse> {
    Json(state.gateway.introspect(&req.token).into())
}

/// POST /purecerts.v1.TokenService/RefreshToken
pub async fn refresh_token<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    RequestOrigin(origin): RequestOrigin,
    Json(req): Json<RefreshTokenRequest>,
) -> AuthResult<Json<TokenResponse>> {
    let tokens = state
        .gateway
        .refresh_token(&req.refresh_token, &origin)
        .await?;
    Ok(Json(tokens.into()))
}

/// POST /purecerts.v1.TokenService/RevokeToken
pub async fn revoke_token<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<RevokeTokenRequest>,
) -> AuthResult<Json<Empty>> {
    state.gateway.revoke_token(&req.token).await?;
    Ok(Json(Empty {}))
}

/// POST /purecerts.v1.TokenService/VerifyTwoFactor
pub async fn verify_two_factor<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    RequestOrigin(origin): RequestOrigin,
    Json(req): Json<VerifyTwoFactorRequest>,
) -> AuthResult<Json<TokenResponse>> {
    let tokens = state
        .gateway
        .verify_second_factor(&req.mfa_token, &req.code, &origin)
        .await?;
    Ok(Json(tokens.into()))
}

// ============================================================================
// UserService
// ============================================================================

/// POST /purecerts.v1.UserService/CreateUser
pub async fn create_user<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<CreateUserRequest>,
) -> AuthResult<Json<UserResponse>> {
    let identity = state
        .registration
        .register(RegisterInput {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            company: req.company,
        })
        .await?;

    Ok(Json(UserResponse {
        user: UserDto::from(&identity),
    }))
}

/// POST /purecerts.v1.UserService/GetCurrentUser
pub async fn get_current_user<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ctx: AuthContext,
) -> AuthResult<Json<UserResponse>> {
    let identity = state.account.current_user(&ctx.identity_id).await?;
    Ok(Json(UserResponse {
        user: UserDto::from(&identity),
    }))
}

/// POST /purecerts.v1.UserService/ChangePassword
pub async fn change_password<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ctx: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> AuthResult<Json<Empty>> {
    state
        .account
        .change_password(&ctx.identity_id, req.current_password, req.new_password)
        .await?;
    Ok(Json(Empty {}))
}

/// POST /purecerts.v1.UserService/Enable2FA
pub async fn enable_two_factor<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ctx: AuthContext,
) -> AuthResult<Json<Enable2FAResponse>> {
    let enrollment = state.two_factor.enable(&ctx.identity_id).await?;
    Ok(Json(enrollment.into()))
}

/// POST /purecerts.v1.UserService/Confirm2FA
pub async fn confirm_two_factor<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ctx: AuthContext,
    Json(req): Json<TwoFactorCodeRequest>,
) -> AuthResult<Json<Confirm2FAResponse>> {
    let enabled = state.two_factor.confirm(&ctx.identity_id, &req.code).await?;
    Ok(Json(Confirm2FAResponse { enabled }))
}

/// POST /purecerts.v1.UserService/Disable2FA
pub async fn disable_two_factor<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ctx: AuthContext,
    Json(req): Json<TwoFactorCodeRequest>,
) -> AuthResult<Json<Empty>> {
    state.two_factor.disable(&ctx.identity_id, &req.code).await?;
    Ok(Json(Empty {}))
}

// ============================================================================
// SessionService
// ============================================================================

/// POST /purecerts.v1.SessionService/ListSessions
pub async fn list_sessions<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ctx: AuthContext,
    Json(req): Json<ListSessionsRequest>,
) -> AuthResult<Json<ListSessionsResponse>> {
    let sessions = state
        .gateway
        .list_sessions(&ctx.identity_id, req.limit)
        .await?
        .into_iter()
        .map(|s| {
            let current = Some(s.id) == ctx.session_id;
            SessionDto::new(s, current)
        })
        .collect();

    Ok(Json(ListSessionsResponse { sessions }))
}

/// POST /purecerts.v1.SessionService/RevokeSession
pub async fn revoke_session<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ctx: AuthContext,
    Json(req): Json<RevokeSessionRequest>,
) -> AuthResult<Json<Empty>> {
    let session_id = SessionId::parse_str(req.session_id.trim())
        .map_err(|_| AuthError::InvalidArgument("invalid session_id".to_string()))?;

    state
        .gateway
        .revoke_session(&ctx.identity_id, &session_id)
        .await?;
    Ok(Json(Empty {}))
}

/// POST /purecerts.v1.SessionService/RevokeAllOtherSessions
pub async fn revoke_all_other_sessions<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ctx: AuthContext,
) -> AuthResult<Json<RevokeAllOtherSessionsResponse>> {
    let revoked = state
        .gateway
        .revoke_all_other_sessions(&ctx.identity_id, ctx.session_id.as_ref())
        .await?;
    Ok(Json(RevokeAllOtherSessionsResponse { revoked }))
}
