//! Three-factor credential verification.
//!
//! Password first, one-time code second. Callers get a tagged outcome;
//! the HTTP boundary collapses every failure tag into one generic message.

use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use pbkdf2::pbkdf2_hmac_array;
use sha2::Sha256;
use totp_rs::{Algorithm, Secret, TOTP};

/// Key-derivation rounds. Changing this invalidates every stored hash.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;
/// Accept the current 30-second step and one step on either side
const TOTP_SKEW: u8 = 1;

/// Base64url salt used to burn the derivation cost for unknown accounts
const PLACEHOLDER_SALT: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

/// Stored credential columns for one account, read-only to this service
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub totp: String,
    pub hash: String,
    pub salt: String,
    pub cipher: String,
}

/// Internal outcome of a login attempt. Never serialized to a response.
#[derive(Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    Success { salt: String, cipher: String },
    UserNotFound,
    PasswordMismatch,
    CodeMismatch,
}

/// Derive the stored encoding of `password` under a base64url `salt`:
/// PBKDF2-HMAC-SHA256 over the decoded salt bytes, encoded base64url
/// without padding.
///
/// # Errors
///
/// Returns an error when the stored salt is not valid base64url.
pub fn derive_password_hash(password: &str, salt: &str) -> Result<String, base64::DecodeError> {
    let raw_salt = URL_SAFE.decode(salt)?;
    let digest = pbkdf2_hmac_array::<Sha256, 32>(password.as_bytes(), &raw_salt, PBKDF2_ITERATIONS);

    Ok(URL_SAFE_NO_PAD.encode(digest))
}

/// Check `code` against a stored base32 secret. A malformed secret, a
/// malformed code or a clock problem all count as invalid, nothing
/// propagates.
#[must_use]
pub fn verify_code(secret: &str, code: &str) -> bool {
    let Ok(bytes) = Secret::Encoded(secret.to_string()).to_bytes() else {
        return false;
    };

    let Ok(totp) = TOTP::new(Algorithm::SHA1, TOTP_DIGITS, TOTP_SKEW, TOTP_STEP, bytes) else {
        return false;
    };

    totp.check_current(code).unwrap_or(false)
}

/// Mint a fresh shared secret for enrollment, base32-encoded the way
/// authenticator apps expect. The secret passes through the same
/// constructor the login path uses, so anything handed out here will
/// verify later.
///
/// # Errors
///
/// Returns an error when the generated secret is rejected, which would
/// mean the generator and the verifier disagree about secret length.
pub fn generate_shared_secret() -> anyhow::Result<String> {
    let bytes = Secret::generate_secret()
        .to_bytes()
        .map_err(|e| anyhow::anyhow!("secret generation failed: {e:?}"))?;
    let totp = TOTP::new(Algorithm::SHA1, TOTP_DIGITS, TOTP_SKEW, TOTP_STEP, bytes)
        .map_err(|e| anyhow::anyhow!("generated secret rejected: {e:?}"))?;

    Ok(totp.get_secret_base32())
}

/// Run both checks against an optional stored record.
#[must_use]
pub fn verify(record: Option<&CredentialRecord>, password: &str, code: &str) -> LoginOutcome {
    let Some(record) = record else {
        // Unknown account still pays the derivation cost, so response time
        // does not reveal whether the email exists
        let _ = derive_password_hash(password, PLACEHOLDER_SALT);

        return LoginOutcome::UserNotFound;
    };

    let Ok(derived) = derive_password_hash(password, &record.salt) else {
        return LoginOutcome::PasswordMismatch;
    };

    if derived != record.hash {
        return LoginOutcome::PasswordMismatch;
    }

    if !verify_code(&record.totp, code) {
        return LoginOutcome::CodeMismatch;
    }

    LoginOutcome::Success {
        salt: record.salt.clone(),
        cipher: record.cipher.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::{SystemTime, UNIX_EPOCH};

    // 32 base32 chars, 20 bytes decoded
    const SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn record(password: &str) -> CredentialRecord {
        let salt = URL_SAFE.encode([7_u8; 32]);
        let hash = derive_password_hash(password, &salt).unwrap();

        CredentialRecord {
            totp: SECRET.to_string(),
            hash,
            salt,
            cipher: "encrypted-blob".to_string(),
        }
    }

    fn totp() -> TOTP {
        let bytes = Secret::Encoded(SECRET.to_string()).to_bytes().unwrap();
        TOTP::new(Algorithm::SHA1, TOTP_DIGITS, TOTP_SKEW, TOTP_STEP, bytes).unwrap()
    }

    /// A six-digit code guaranteed to be outside the acceptance window
    fn wrong_code(totp: &TOTP) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let valid: HashSet<String> = [now.saturating_sub(TOTP_STEP), now, now + TOTP_STEP]
            .iter()
            .map(|ts| totp.generate(*ts))
            .collect();
        let current: u32 = totp.generate(now).parse().unwrap();

        (1..)
            .map(|offset| format!("{:06}", (current + offset) % 1_000_000))
            .find(|code| !valid.contains(code))
            .unwrap()
    }

    #[test]
    fn test_placeholder_salt_is_32_bytes() {
        assert_eq!(PLACEHOLDER_SALT.len(), 44);
        assert_eq!(URL_SAFE.decode(PLACEHOLDER_SALT).unwrap(), vec![0_u8; 32]);
    }

    #[test]
    fn test_derive_password_hash_shape() {
        let salt = URL_SAFE.encode([7_u8; 32]);

        let first = derive_password_hash("correct horse", &salt).unwrap();
        let second = derive_password_hash("correct horse", &salt).unwrap();
        assert_eq!(first, second);

        assert_eq!(first.len(), 43);
        assert!(!first.contains('='));
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        assert_ne!(first, derive_password_hash("wrong horse", &salt).unwrap());

        let other_salt = URL_SAFE.encode([8_u8; 32]);
        assert_ne!(first, derive_password_hash("correct horse", &other_salt).unwrap());
    }

    #[test]
    fn test_derive_password_hash_rejects_bad_salt() {
        assert!(derive_password_hash("password", "not base64!!!").is_err());
    }

    #[test]
    fn test_verify_unknown_account() {
        assert_eq!(
            verify(None, "password", "000000"),
            LoginOutcome::UserNotFound
        );
    }

    #[test]
    fn test_verify_wrong_password() {
        let record = record("correct horse");
        let code = totp().generate_current().unwrap();

        assert_eq!(
            verify(Some(&record), "wrong horse", &code),
            LoginOutcome::PasswordMismatch
        );
    }

    #[test]
    fn test_verify_wrong_code() {
        let record = record("correct horse");
        let code = wrong_code(&totp());

        assert_eq!(
            verify(Some(&record), "correct horse", &code),
            LoginOutcome::CodeMismatch
        );
    }

    #[test]
    fn test_verify_success() {
        let record = record("correct horse");
        let code = totp().generate_current().unwrap();

        assert_eq!(
            verify(Some(&record), "correct horse", &code),
            LoginOutcome::Success {
                salt: record.salt.clone(),
                cipher: record.cipher.clone(),
            }
        );
    }

    #[test]
    fn test_verify_undecodable_stored_salt() {
        let mut record = record("correct horse");
        record.salt = "not base64!!!".to_string();

        assert_eq!(
            verify(Some(&record), "correct horse", "000000"),
            LoginOutcome::PasswordMismatch
        );
    }

    #[test]
    fn test_verify_code_rejects_bad_secret() {
        assert!(!verify_code("not base32!!!", "000000"));
        // Too short for a valid TOTP secret
        assert!(!verify_code("JBSWY3DP", "000000"));
    }

    #[test]
    fn test_generate_shared_secret_round_trip() {
        let secret = generate_shared_secret().unwrap();

        assert!(secret.len() >= 26);
        assert!(secret
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));

        // A minted secret must be usable by the verifier
        let bytes = Secret::Encoded(secret.clone()).to_bytes().unwrap();
        let totp = TOTP::new(Algorithm::SHA1, TOTP_DIGITS, TOTP_SKEW, TOTP_STEP, bytes).unwrap();
        assert!(verify_code(&secret, &totp.generate_current().unwrap()));

        assert_ne!(secret, generate_shared_secret().unwrap());
    }
}
