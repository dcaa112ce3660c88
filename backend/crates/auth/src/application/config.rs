//! Application Configuration
//!
//! Everything the auth core needs at runtime, passed in explicitly at startup.

use std::time::Duration;

/// Minimum HS256 key length accepted by [`AuthConfig::validate`].
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing key for access tokens
    pub token_secret: Vec<u8>,
    /// Access token lifetime (15 minutes)
    pub access_token_ttl: Duration,
    /// Refresh token lifetime (7 days)
    pub refresh_token_ttl: Duration,
    /// Session record lifetime (7 days)
    pub session_ttl: Duration,
    /// Pending second-factor challenge lifetime (5 minutes)
    pub mfa_challenge_ttl: Duration,
    /// Shown in authenticator apps
    pub totp_issuer: String,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Query HIBP when a password is set
    pub breach_check: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: vec![0u8; MIN_TOKEN_SECRET_LEN],
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 3600),
            session_ttl: Duration::from_secs(7 * 24 * 3600),
            mfa_challenge_ttl: Duration::from_secs(5 * 60),
            totp_issuer: "PureCerts".to_string(),
            password_pepper: None,
            breach_check: true,
        }
    }
}

impl AuthConfig {
    /// Config with a random signing key. Tokens do not survive a restart.
    pub fn with_random_secret() -> Self {
        use rand::RngCore;
        let mut secret = vec![0u8; MIN_TOKEN_SECRET_LEN];
        rand::rng().fill_bytes(&mut secret);
        Self {
            token_secret: secret,
            ..Default::default()
        }
    }

    /// Local runs and tests: random key, no outbound breach lookups.
    pub fn development() -> Self {
        Self {
            breach_check: false,
            ..Self::with_random_secret()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.token_secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(format!(
                "token secret must be at least {} bytes (got {})",
                MIN_TOKEN_SECRET_LEN,
                self.token_secret.len()
            ));
        }
        if self.token_secret.iter().all(|&b| b == 0) {
            return Err("token secret is all zeroes".to_string());
        }
        if self.access_token_ttl.is_zero() || self.refresh_token_ttl.is_zero() {
            return Err("token lifetimes must be non-zero".to_string());
        }
        Ok(())
    }

    pub fn access_token_ttl_secs(&self) -> i64 {
        self.access_token_ttl.as_secs() as i64
    }

    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    pub(crate) fn chrono(ttl: Duration) -> chrono::Duration {
        chrono::Duration::seconds(ttl.as_secs() as i64)
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("session_ttl", &self.session_ttl)
            .field("mfa_challenge_ttl", &self.mfa_challenge_ttl)
            .field("totp_issuer", &self.totp_issuer)
            .field("password_pepper", &self.password_pepper.as_ref().map(|_| "[REDACTED]"))
            .field("breach_check", &self.breach_check)
            .finish()
    }
}
