//! TOTP Secret Value Object
//!
//! RFC 6238 secret compatible with common authenticator apps:
//! SHA1, 6 digits, 30 s step, one step of skew either way.

use serde::{Deserialize, Serialize};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::{AuthError, AuthResult};

const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;
const TOTP_SKEW: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotpSecret {
    secret_base32: String,
}

/// What the user needs to enroll an authenticator.
#[derive(Debug, Clone)]
pub struct TotpEnrollment {
    pub secret: String,
    pub otpauth_url: String,
    /// base64 PNG
    pub qr_code: String,
}

impl TotpSecret {
    pub fn generate() -> Self {
        Self {
            secret_base32: Secret::generate_secret().to_encoded().to_string(),
        }
    }

    pub fn from_base32(secret: impl Into<String>) -> AuthResult<Self> {
        let secret_base32 = secret.into();
        Secret::Encoded(secret_base32.clone())
            .to_bytes()
            .map_err(|e| AuthError::Internal(format!("Invalid TOTP secret: {e}")))?;
        Ok(Self { secret_base32 })
    }

    pub fn as_base32(&self) -> &str {
        &self.secret_base32
    }

    fn to_totp(&self, issuer: &str, account_name: &str) -> AuthResult<TOTP> {
        let bytes = Secret::Encoded(self.secret_base32.clone())
            .to_bytes()
            .map_err(|e| AuthError::Internal(format!("Invalid TOTP secret: {e}")))?;

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            bytes,
            Some(issuer.to_string()),
            account_name.to_string(),
        )
        .map_err(|e| AuthError::Internal(format!("Failed to build TOTP: {e}")))
    }

    /// Malformed codes are simply invalid.
    pub fn verify(&self, code: &str, issuer: &str, account_name: &str) -> AuthResult<bool> {
        let code = code.trim();
        if code.len() != TOTP_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(false);
        }
        let totp = self.to_totp(issuer, account_name)?;
        Ok(totp.check_current(code).unwrap_or(false))
    }

    pub fn enrollment(&self, issuer: &str, account_name: &str) -> AuthResult<TotpEnrollment> {
        let totp = self.to_totp(issuer, account_name)?;
        let qr_code = totp
            .get_qr_base64()
            .map_err(|e| AuthError::Internal(format!("Failed to render QR code: {e}")))?;

        Ok(TotpEnrollment {
            secret: self.secret_base32.clone(),
            otpauth_url: totp.get_url(),
            qr_code,
        })
    }

    #[cfg(test)]
    pub fn current_code(&self, issuer: &str, account_name: &str) -> String {
        self.to_totp(issuer, account_name)
            .unwrap()
            .generate_current()
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "PureCerts";
    const ACCOUNT: &str = "ops@example.com";

    #[test]
    fn test_generated_secret_verifies_current_code() {
        let secret = TotpSecret::generate();
        let code = secret.current_code(ISSUER, ACCOUNT);
        assert!(secret.verify(&code, ISSUER, ACCOUNT).unwrap());
    }

    #[test]
    fn test_malformed_codes_are_rejected() {
        let secret = TotpSecret::generate();
        for bad in ["", "12345", "1234567", "abcdef", "12 456"] {
            assert!(!secret.verify(bad, ISSUER, ACCOUNT).unwrap(), "{bad:?}");
        }
    }

    #[test]
    fn test_from_base32_roundtrip() {
        let secret = TotpSecret::generate();
        let restored = TotpSecret::from_base32(secret.as_base32()).unwrap();
        assert_eq!(secret, restored);
        assert!(TotpSecret::from_base32("not base32 !!").is_err());
    }

    #[test]
    fn test_enrollment_material() {
        let secret = TotpSecret::generate();
        let enrollment = secret.enrollment(ISSUER, ACCOUNT).unwrap();
        assert_eq!(enrollment.secret, secret.as_base32());
        assert!(enrollment.otpauth_url.starts_with("otpauth://totp/"));
        assert!(enrollment.otpauth_url.contains("issuer=PureCerts"));
        assert!(!enrollment.qr_code.is_empty());
    }
}
