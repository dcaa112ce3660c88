//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum. Each kind carries an RPC status code
//! (the string clients switch on) and the HTTP status used on the wire.

use serde::Serialize;

/// Error classification shared by every crate in the workspace.
///
/// The variants follow the RPC status taxonomy exposed to clients. Each one
/// maps to exactly one HTTP status code.
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::NotFound;
/// assert_eq!(kind.status_code(), 404);
/// assert_eq!(kind.rpc_code(), "not_found");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// 400 - malformed request or unsupported argument
    InvalidArgument,
    /// 401 - missing or invalid credentials
    Unauthenticated,
    /// 403 - caller is known but not allowed
    PermissionDenied,
    /// 404
    NotFound,
    /// 409 - resource already exists
    AlreadyExists,
    /// 422 - system is not in the state required by the operation
    FailedPrecondition,
    /// 429
    ResourceExhausted,
    /// 504
    DeadlineExceeded,
    /// 500 - internals are logged, never sent
    Internal,
    /// 501
    Unimplemented,
    /// 503
    Unavailable,
}

impl ErrorKind {
    /// HTTP status code for this kind.
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::InvalidArgument.status_code(), 400);
    /// assert_eq!(ErrorKind::AlreadyExists.status_code(), 409);
    /// ```
    #[inline]
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidArgument => 400,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::PermissionDenied => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExists => 409,
            ErrorKind::FailedPrecondition => 422,
            ErrorKind::ResourceExhausted => 429,
            ErrorKind::Internal => 500,
            ErrorKind::Unimplemented => 501,
            ErrorKind::Unavailable => 503,
            ErrorKind::DeadlineExceeded => 504,
        }
    }

    /// Machine-readable code placed in the `code` field of error bodies.
    #[inline]
    pub const fn rpc_code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::FailedPrecondition => "failed_precondition",
            ErrorKind::ResourceExhausted => "resource_exhausted",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
            ErrorKind::Internal => "internal",
            ErrorKind::Unimplemented => "unimplemented",
            ErrorKind::Unavailable => "unavailable",
        }
    }

    /// Human-readable title.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "Invalid Argument",
            ErrorKind::Unauthenticated => "Unauthenticated",
            ErrorKind::PermissionDenied => "Permission Denied",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::AlreadyExists => "Already Exists",
            ErrorKind::FailedPrecondition => "Failed Precondition",
            ErrorKind::ResourceExhausted => "Resource Exhausted",
            ErrorKind::DeadlineExceeded => "Deadline Exceeded",
            ErrorKind::Internal => "Internal",
            ErrorKind::Unimplemented => "Unimplemented",
            ErrorKind::Unavailable => "Unavailable",
        }
    }

    /// 5xx kinds. These should be logged at error level.
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    #[inline]
    pub const fn is_client_error(&self) -> bool {
        let code = self.status_code();
        code >= 400 && code < 500
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
