//! Database helpers for the account endpoints.

use super::verify::CredentialRecord;
use crate::current_timestamp;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::Instrument;
use uuid::Uuid;

/// A validated intake submission ready to be persisted
#[derive(Debug)]
pub(super) struct NewRegistration {
    pub(super) id: Uuid,
    pub(super) payload: String,
    pub(super) ip: String,
    pub(super) browser: String,
    pub(super) submitted_at: String,
}

impl NewRegistration {
    pub(super) fn new(payload: String, ip: String, browser: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            payload,
            ip,
            browser,
            submitted_at: current_timestamp(),
        }
    }
}

/// Look up stored credentials by email. The users table is written by the
/// approval process, never by this service.
pub(super) async fn lookup_credentials(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<CredentialRecord>> {
    let query = "SELECT totp, hash, salt, cipher FROM users WHERE email = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row: Option<(String, String, String, String)> = sqlx::query_as(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to look up credentials")?;

    Ok(row.map(|(totp, hash, salt, cipher)| CredentialRecord {
        totp,
        hash,
        salt,
        cipher,
    }))
}

/// Persist an intake record for manual review.
pub(super) async fn insert_registration(
    pool: &SqlitePool,
    registration: &NewRegistration,
) -> Result<()> {
    let query =
        "INSERT INTO registrations (id, payload, ip, browser, submitted_at) VALUES (?, ?, ?, ?, ?)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(registration.id.to_string())
        .bind(&registration.payload)
        .bind(&registration.ip)
        .bind(&registration.browser)
        .bind(&registration.submitted_at)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record registration")?;

    Ok(())
}
