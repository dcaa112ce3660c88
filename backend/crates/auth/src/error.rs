//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::domain::repository::RepositoryError;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidArgument(String),

    /// Unknown email and wrong password share this variant.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed, expired or revoked token.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Identity not found")]
    IdentityNotFound,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid two-factor authentication code")]
    InvalidTwoFactorCode,

    #[error("Two-factor authentication is not set up")]
    TwoFactorNotSetup,

    #[error("Two-factor authentication is already enabled")]
    TwoFactorAlreadyEnabled,

    #[error("{0}")]
    PasswordPolicy(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidArgument(_) | AuthError::PasswordPolicy(_) => {
                ErrorKind::InvalidArgument
            }
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::InvalidTwoFactorCode => ErrorKind::Unauthenticated,
            AuthError::AccountDisabled => ErrorKind::PermissionDenied,
            AuthError::IdentityNotFound | AuthError::SessionNotFound => ErrorKind::NotFound,
            AuthError::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            AuthError::EmailTaken => ErrorKind::AlreadyExists,
            AuthError::TwoFactorNotSetup | AuthError::TwoFactorAlreadyEnabled => {
                ErrorKind::FailedPrecondition
            }
            AuthError::Repository(_) | AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Client-facing form. Internal details never leave the process.
    pub fn to_app_error(&self) -> AppError {
        match self.kind() {
            ErrorKind::Internal => AppError::internal("Internal error"),
            ErrorKind::NotFound if matches!(self, AuthError::Repository(_)) => {
                AppError::not_found("Resource not found")
            }
            kind => AppError::new(kind, self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            AuthError::Repository(RepositoryError::NotFound) => {
                tracing::debug!("Auth lookup found nothing");
            }
            AuthError::Repository(e) => {
                tracing::error!(error = %e, "Auth repository error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::AccountDisabled => {
                tracing::warn!("Login attempt on disabled account");
            }
            AuthError::InvalidTwoFactorCode => {
                tracing::warn!("Invalid second factor presented");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::InvalidArgument => AuthError::InvalidArgument(err.message().to_string()),
            _ => AuthError::Internal(err.to_string()),
        }
    }
}
