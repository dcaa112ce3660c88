//! Platform Crate - Technical Infrastructure
//!
//! Technical foundations shared by the domain crates:
//! - Cryptographic utilities (SHA-256, Base64, opaque tokens)
//! - Password hashing (Argon2id, NIST SP 800-63B policy, HIBP lookup)
//! - Client origin extraction from HTTP headers

pub mod client;
pub mod crypto;
pub mod password;
