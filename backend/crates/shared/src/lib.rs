//! Shared Kernel - vocabulary used by every crate in the workspace
//!
//! - [`error`]: the client-facing [`AppError`](error::app_error::AppError)
//!   and its [`ErrorKind`](error::kind::ErrorKind) taxonomy
//! - [`id`]: typed UUID identifiers
//!
//! Only things whose meaning is identical across all domains belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
