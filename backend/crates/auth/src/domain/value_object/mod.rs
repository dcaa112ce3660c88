//! Value Object Module

pub mod email;
pub mod password;
pub mod role;
pub mod token_digest;
pub mod totp_secret;
