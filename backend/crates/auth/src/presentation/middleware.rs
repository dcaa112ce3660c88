//! Auth Middleware
//!
//! Bearer-token gate for protected routes, plus extractors for the
//! authenticated caller and the request origin.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use kernel::id::{IdentityId, SessionId, TenantId};
use platform::client::ClientOrigin;

use crate::application::token_issuer::{AccessClaims, TokenIssuer};
use crate::domain::value_object::role::Role;
use crate::error::AuthError;

/// The caller, as asserted by a valid access token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity_id: IdentityId,
    pub tenant_id: TenantId,
    pub session_id: Option<SessionId>,
    pub role: Role,
    pub email: String,
}

impl TryFrom<AccessClaims> for AuthContext {
    type Error = AuthError;

    fn try_from(claims: AccessClaims) -> Result<Self, Self::Error> {
        Ok(Self {
            identity_id: claims.identity_id().ok_or(AuthError::InvalidToken)?,
            tenant_id: claims.tenant().ok_or(AuthError::InvalidToken)?,
            session_id: claims.session_id(),
            role: claims.role().ok_or(AuthError::InvalidToken)?,
            email: claims.email,
        })
    }
}

/// Middleware that requires a valid bearer access token
pub async fn require_bearer(
    State(issuer): State<Arc<TokenIssuer>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AuthError::InvalidToken)?;

    let claims = issuer
        .validate(bearer.token())
        .map_err(|_| AuthError::InvalidToken)?;
    let context = AuthContext::try_from(claims)?;

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

/// Client IP and user agent of the request.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin(pub ClientOrigin);

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let direct_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());

        Ok(RequestOrigin(ClientOrigin::from_headers(&parts.headers, direct_ip)))
    }
}
