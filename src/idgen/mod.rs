//! Collision-free random identifiers backed by the used-identifier ledger.
//!
//! Every value handed out here is claimed in `used_ids` before it is
//! returned, so salts and one-time tokens share a single uniqueness
//! namespace for the lifetime of the database.

use crate::current_timestamp;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE, Engine};
use rand::{rngs::OsRng, RngCore};
use sqlx::SqlitePool;
use std::fmt::Write;
use tracing::Instrument;

/// Character set for a generated identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    Base64Url,
    Base16,
}

/// Generate a unique random identifier of exactly `length` characters.
///
/// Draws `length` bytes of OS randomness, encodes them to the requested
/// alphabet and truncates to `length`. The candidate is claimed through the
/// ledger's primary key; a collision retries with fresh randomness.
///
/// # Errors
///
/// Returns an error when `length` is zero or the claim cannot be persisted.
pub async fn generate(pool: &SqlitePool, length: usize, alphabet: Alphabet) -> Result<String> {
    if length == 0 {
        anyhow::bail!("identifier length must be at least 1");
    }

    loop {
        let id = candidate(length, alphabet);

        if claim(pool, &id).await? {
            return Ok(id);
        }
    }
}

/// Generate a unique salt: 32 random bytes, base64url with padding (44 chars)
///
/// # Errors
///
/// Returns an error if the claim cannot be persisted.
pub async fn generate_salt(pool: &SqlitePool) -> Result<String> {
    loop {
        let mut bytes = [0_u8; 32];
        OsRng.fill_bytes(&mut bytes);

        let salt = URL_SAFE.encode(bytes);

        if claim(pool, &salt).await? {
            return Ok(salt);
        }
    }
}

fn candidate(length: usize, alphabet: Alphabet) -> String {
    let mut bytes = vec![0_u8; length];
    OsRng.fill_bytes(&mut bytes);

    let mut encoded = match alphabet {
        Alphabet::Base64Url => URL_SAFE.encode(&bytes),
        Alphabet::Base16 => {
            let mut hex = String::with_capacity(bytes.len() * 2);
            for byte in &bytes {
                let _ = write!(hex, "{byte:02x}");
            }
            hex
        }
    };

    encoded.truncate(length);
    encoded
}

/// Record the identifier in the ledger. Returns `false` when another caller
/// already holds it.
async fn claim(pool: &SqlitePool, id: &str) -> Result<bool> {
    let query = "INSERT INTO used_ids (id, created_at) VALUES (?, ?)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .bind(current_timestamp())
        .execute(pool)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(true),
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(err).context("failed to claim identifier"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}
