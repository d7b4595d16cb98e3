//! Stateless signed session cookie, re-armed with a sliding lifetime on
//! every response that passes the gate.

use crate::cli::globals::{Environment, GlobalArgs};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use secrecy::ExposeSecret;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sliding cookie lifetime: 92 days
pub const SESSION_LIFETIME_SECS: u64 = 92 * 24 * 60 * 60;

pub fn cookie_name(environment: Environment) -> &'static str {
    if environment.is_prod() {
        "__Host-session"
    } else {
        "session"
    }
}

/// Build the `Set-Cookie` value for this response. A valid incoming token
/// keeps its value (only the lifetime slides), anything else gets a fresh
/// token.
///
/// # Errors
///
/// Returns an error if the signing key is unusable.
pub fn issue(globals: &GlobalArgs, incoming: Option<&str>) -> Result<String> {
    let key = globals.session_key.expose_secret();

    let token = match incoming {
        Some(value) if verify(key, value) => value.to_string(),
        _ => mint(key)?,
    };

    let name = cookie_name(globals.environment);
    let mut cookie = format!(
        "{name}={token}; Max-Age={SESSION_LIFETIME_SECS}; Path=/; HttpOnly; SameSite=Strict"
    );

    if globals.environment.is_prod() {
        cookie.push_str("; Secure");
    }

    Ok(cookie)
}

/// Extract this service's session value from a `Cookie` header.
pub fn from_header(header: Option<&str>, name: &str) -> Option<String> {
    header?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(cookie, _)| *cookie == name)
        .map(|(_, value)| value.to_string())
}

fn mint(key: &[u8]) -> Result<String> {
    let mut raw = [0_u8; 32];
    OsRng.fill_bytes(&mut raw);

    let token = URL_SAFE_NO_PAD.encode(raw);
    let tag = sign(key, &token)?;

    Ok(format!("{token}.{tag}"))
}

fn sign(key: &[u8], token: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key).context("invalid session key")?;
    mac.update(token.as_bytes());

    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

pub fn verify(key: &[u8], value: &str) -> bool {
    let Some((token, tag)) = value.rsplit_once('.') else {
        return false;
    };

    let Ok(expected) = URL_SAFE_NO_PAD.decode(tag) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(token.as_bytes());

    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretSlice;

    fn globals(environment: Environment) -> GlobalArgs {
        GlobalArgs::new(environment, SecretSlice::from(vec![42_u8; 64]))
    }

    #[test]
    fn test_mint_verify_round_trip() {
        let key = vec![42_u8; 64];

        let value = mint(&key).unwrap();
        assert!(verify(&key, &value));

        // Flip a token character
        let mut tampered = value.clone();
        let first = if tampered.starts_with('A') { 'B' } else { 'A' };
        tampered.replace_range(0..1, &first.to_string());
        assert!(!verify(&key, &tampered));

        assert!(!verify(&key, "no-separator"));
        assert!(!verify(&key, &format!("{value}x")));
        assert!(!verify(&vec![7_u8; 64], &value));
    }

    #[test]
    fn test_issue_dev_attributes() {
        let cookie = issue(&globals(Environment::Dev), None).unwrap();

        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("Max-Age=7948800"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_issue_prod_attributes() {
        let cookie = issue(&globals(Environment::Prod), None).unwrap();

        assert!(cookie.starts_with("__Host-session="));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_issue_keeps_valid_token() {
        let globals = globals(Environment::Dev);
        let key = globals.session_key.expose_secret().to_vec();

        let token = mint(&key).unwrap();
        let cookie = issue(&globals, Some(&token)).unwrap();
        assert!(cookie.starts_with(&format!("session={token};")));

        // A forged value is replaced, not echoed back
        let cookie = issue(&globals, Some("forged.token")).unwrap();
        assert!(!cookie.contains("forged.token"));
    }

    #[test]
    fn test_from_header() {
        let header = "theme=dark; session=abc.def; lang=eo";

        assert_eq!(
            from_header(Some(header), "session"),
            Some("abc.def".to_string())
        );
        assert_eq!(from_header(Some(header), "__Host-session"), None);
        assert_eq!(from_header(None, "session"), None);
    }
}
