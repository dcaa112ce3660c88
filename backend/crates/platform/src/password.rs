//! Password hashing and policy
//!
//! - Argon2id PHC strings (salt and cost parameters travel with the hash)
//! - optional pepper, applied as the Argon2 secret input
//! - NIST SP 800-63B length/character policy for *new* passwords only
//! - HIBP k-anonymity breach lookup (only a SHA-1 prefix leaves the process)
//!
//! Login input goes through [`ClearTextPassword::for_verification`], which
//! normalizes but never rejects: a policy error at login would tell the caller
//! something about the stored password.

use std::fmt;
use std::time::Duration;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use sha1::{Digest, Sha1};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// NIST: SHALL be at least 8
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// NIST: SHOULD permit at least 64
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Upper bound for login input; anything longer is cut before hashing.
const MAX_VERIFY_INPUT: usize = 1024;

const HIBP_RANGE_URL: &str = "https://api.pwnedpasswords.com/range/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("This password has appeared in a data breach")]
    Compromised,

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    #[error("Password is too common or follows a predictable pattern")]
    CommonPattern,
}

#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,

    /// Non-fatal: callers log it and carry on.
    #[error("Breach check failed: {0}")]
    BreachCheckFailed(String),
}

/// Clear text password, zeroized on drop, redacted in `Debug`.
///
/// Deliberately not `Clone`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Normalize (NFKC) and enforce the policy. Use for registration and
    /// password changes.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let candidate = Self::for_verification(raw);
        check_policy(&candidate.0)?;
        Ok(candidate)
    }

    /// Normalize only. Use for passwords presented at login.
    pub fn for_verification(raw: String) -> Self {
        let mut normalized: String = raw.nfkc().take(MAX_VERIFY_INPUT).collect();
        let mut raw = raw;
        raw.zeroize();
        normalized.shrink_to_fit();
        Self(normalized)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Hash with Argon2id and a fresh 128-bit salt.
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(OsRng);
        let hash = hasher(pepper)?
            .hash_password(self.as_bytes(), &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }

    /// Uppercase hex SHA-1, split into the 5-char range prefix and the suffix.
    fn sha1_range(&self) -> (String, String) {
        let digest = Sha1::digest(self.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{:02X}", b)).collect();
        let (prefix, suffix) = hex.split_at(5);
        (prefix.to_string(), suffix.to_string())
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

/// Argon2id hash in PHC string format. Safe to store.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    /// A hash of random bytes nobody knows. Verifying against it costs the
    /// same as a real verification and always fails.
    pub fn decoy(pepper: Option<&[u8]>) -> Result<Self, PasswordHashError> {
        let random = crate::crypto::to_base64_url(&crate::crypto::random_bytes(24));
        ClearTextPassword::for_verification(random).hash(pepper)
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Constant-time verification. `pepper` must match the one used to hash.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.hash) else {
            return false;
        };
        let Ok(argon2) = hasher(pepper) else {
            return false;
        };
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

/// HIBP range client.
#[derive(Debug, Clone)]
pub struct BreachChecker {
    client: reqwest::Client,
    base_url: String,
}

impl BreachChecker {
    pub fn new(timeout: Duration) -> Result<Self, PasswordHashError> {
        Self::with_base_url(HIBP_RANGE_URL, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PasswordHashError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PasswordHashError::BreachCheckFailed(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// `Ok(true)` when the password appears in the breach corpus. Errors
    /// should be treated as "unknown", never as a rejection.
    pub async fn is_compromised(
        &self,
        password: &ClearTextPassword,
    ) -> Result<bool, PasswordHashError> {
        let (prefix, suffix) = password.sha1_range();
        let url = format!("{}{}", self.base_url, prefix);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PasswordHashError::BreachCheckFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PasswordHashError::BreachCheckFailed(format!(
                "range endpoint returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PasswordHashError::BreachCheckFailed(e.to_string()))?;

        Ok(range_contains(&body, &suffix))
    }
}

fn hasher(pepper: Option<&[u8]>) -> Result<Argon2<'_>, PasswordHashError> {
    match pepper {
        Some(secret) => {
            Argon2::new_with_secret(secret, Algorithm::Argon2id, Version::V0x13, Params::default())
                .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))
        }
        None => Ok(Argon2::default()),
    }
}

/// Body lines look like `SUFFIX:COUNT`.
fn range_contains(body: &str, suffix: &str) -> bool {
    body.lines()
        .filter_map(|line| line.split_once(':'))
        .any(|(candidate, count)| {
            // Padding entries carry a zero count.
            candidate.trim().eq_ignore_ascii_case(suffix) && count.trim() != "0"
        })
}

fn check_policy(normalized: &str) -> Result<(), PasswordPolicyError> {
    if normalized.trim().is_empty() {
        return Err(PasswordPolicyError::EmptyOrWhitespace);
    }

    // code points, not bytes
    let actual = normalized.chars().count();
    if actual < MIN_PASSWORD_LENGTH {
        return Err(PasswordPolicyError::TooShort {
            min: MIN_PASSWORD_LENGTH,
            actual,
        });
    }
    if actual > MAX_PASSWORD_LENGTH {
        return Err(PasswordPolicyError::TooLong {
            max: MAX_PASSWORD_LENGTH,
            actual,
        });
    }

    if normalized
        .chars()
        .any(|ch| ch.is_control() && !matches!(ch, '\t' | '\n'))
    {
        return Err(PasswordPolicyError::InvalidCharacter);
    }

    if is_common_pattern(normalized) {
        return Err(PasswordPolicyError::CommonPattern);
    }

    Ok(())
}

fn is_common_pattern(password: &str) -> bool {
    const KEYBOARD_RUNS: &[&str] = &["qwerty", "asdfgh", "zxcvbn", "qazwsx", "1qaz2wsx"];
    const COMMON: &[&str] = &[
        "password",
        "password1",
        "password123",
        "abcdefgh",
        "letmein1",
        "welcome1",
        "admin123",
        "iloveyou",
        "sunshine",
        "princess",
        "football",
        "baseball",
        "trustno1",
        "changeme",
    ];

    let lower = password.to_lowercase();

    let mut chars = lower.chars();
    if let Some(first) = chars.next() {
        if chars.all(|c| c == first) {
            return true;
        }
    }

    if is_digit_run(&lower) {
        return true;
    }

    KEYBOARD_RUNS.iter().any(|run| lower.contains(run)) || COMMON.contains(&lower.as_str())
}

/// "12345678", "98765432", wrapping through 0.
fn is_digit_run(s: &str) -> bool {
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 4 || digits.len() != s.chars().count() {
        return false;
    }
    let up = digits.windows(2).all(|w| (w[0] + 1) % 10 == w[1]);
    let down = digits.windows(2).all(|w| (w[1] + 1) % 10 == w[0]);
    up || down
}
