//! SHA-256 digest of an opaque token.
//!
//! Refresh and challenge tokens are only ever stored in this form.

use platform::crypto::{sha256, to_base64_url};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenDigest([u8; 32]);

impl TokenDigest {
    pub fn of(raw_token: &str) -> Self {
        Self(sha256(raw_token.as_bytes()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Short prefix, enough to correlate log lines.
impl fmt::Debug for TokenDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenDigest({}…)", to_base64_url(&self.0[..6]))
    }
}

impl fmt::Display for TokenDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_base64_url(&self.0[..6]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(TokenDigest::of("abc"), TokenDigest::of("abc"));
        assert_ne!(TokenDigest::of("abc"), TokenDigest::of("abd"));
    }

    #[test]
    fn test_from_bytes_requires_32() {
        let digest = TokenDigest::of("token");
        assert_eq!(TokenDigest::from_bytes(digest.as_bytes()), Some(digest));
        assert_eq!(TokenDigest::from_bytes(&[0u8; 31]), None);
    }

    #[test]
    fn test_display_does_not_leak_full_digest() {
        let digest = TokenDigest::of("token");
        assert_eq!(digest.to_string().len(), 8);
    }
}
