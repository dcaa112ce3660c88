//! Auth Router
//!
//! Connect-style routes: `POST /purecerts.v1.<Service>/<Method>`.

use axum::{Router, middleware::from_fn_with_state, routing::post};
use std::sync::Arc;

use crate::application::AuthServices;
use crate::domain::repository::AuthStore;
use crate::presentation::handlers;
use crate::presentation::middleware::require_bearer;

const TOKEN_SERVICE: &str = "/purecerts.v1.TokenService";
const USER_SERVICE: &str = "/purecerts.v1.UserService";
const SESSION_SERVICE: &str = "/purecerts.v1.SessionService";

fn method(service: &str, name: &str) -> String {
    format!("{service}/{name}")
}

/// Create the auth router for any store implementation
pub fn auth_router<R: AuthStore>(services: Arc<AuthServices<R>>) -> Router {
    let public = Router::new()
        .route(&method(TOKEN_SERVICE, "CreateToken"), post(handlers::create_token::<R>))
        .route(&method(TOKEN_SERVICE, "IntrospectToken"), post(handlers::introspect_token::<R>))
        .route(&method(TOKEN_SERVICE, "RefreshToken"), post(handlers::refresh_token::<R>))
        .route(&method(TOKEN_SERVICE, "RevokeToken"), post(handlers::revoke_token::<R>))
        .route(&method(TOKEN_SERVICE, "VerifyTwoFactor"), post(handlers::verify_two_factor::<R>))
        .route(&method(USER_SERVICE, "CreateUser"), post(handlers::create_user::<R>));

    let protected = Router::new()
        .route(&method(USER_SERVICE, "GetCurrentUser"), post(handlers::get_current_user::<R>))
        .route(&method(USER_SERVICE, "ChangePassword"), post(handlers::change_password::<R>))
        .route(&method(USER_SERVICE, "Enable2FA"), post(handlers::enable_two_factor::<R>))
        .route(&method(USER_SERVICE, "Confirm2FA"), post(handlers::confirm_two_factor::<R>))
        .route(&method(USER_SERVICE, "Disable2FA"), post(handlers::disable_two_factor::<R>))
        .route(&method(SESSION_SERVICE, "ListSessions"), post(handlers::list_sessions::<R>))
        .route(&method(SESSION_SERVICE, "RevokeSession"), post(handlers::revoke_session::<R>))
        .route(
            &method(SESSION_SERVICE, "RevokeAllOtherSessions"),
            post(handlers::revoke_all_other_sessions::<R>),
        )
        .route_layer(from_fn_with_state(services.issuer().clone(), require_bearer));

    public.merge(protected).with_state(services)
}
