//! Per-IP trust scores.
//!
//! One record per IP, created lazily the first time an address is seen and
//! never deleted. A score of `0` means the caller is banned; anything else
//! passes the gate. Nothing in the request path mutates an existing score,
//! [`set_score`] is the hook for an operator or a future scoring policy.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::Instrument;

/// Score for an address seen for the first time
pub const DEFAULT_SCORE: i64 = 2;

/// Score that blocks a caller at the gate
pub const BANNED_SCORE: i64 = 0;

const DEFAULT_LABEL: &str = "unknown";

/// Result of a reputation lookup, keeps "no record" distinct from "score 0"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreLookup {
    Found(i64),
    NotFound,
}

/// Fetch the stored score for `ip`, without creating a record.
///
/// # Errors
///
/// Returns an error when the query fails.
pub async fn lookup(pool: &SqlitePool, ip: &str) -> Result<ScoreLookup> {
    let query = "SELECT score FROM ips WHERE ip = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "SELECT",
        db.statement = query
    );
    let row: Option<(i64,)> = sqlx::query_as(query)
        .bind(ip)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to look up reputation")?;

    Ok(row.map_or(ScoreLookup::NotFound, |(score,)| ScoreLookup::Found(score)))
}

/// Fetch the score for `ip`, creating the default record on first sight.
///
/// # Errors
///
/// Returns an error when the record cannot be read or created.
pub async fn observe(pool: &SqlitePool, ip: &str) -> Result<i64> {
    if let ScoreLookup::Found(score) = lookup(pool, ip).await? {
        return Ok(score);
    }

    let query = "INSERT INTO ips (ip, score, label) VALUES (?, ?, ?) ON CONFLICT (ip) DO NOTHING";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(ip)
        .bind(DEFAULT_SCORE)
        .bind(DEFAULT_LABEL)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to create reputation record")?;

    if result.rows_affected() == 1 {
        return Ok(DEFAULT_SCORE);
    }

    // Lost the race against a concurrent first request from the same IP
    match lookup(pool, ip).await? {
        ScoreLookup::Found(score) => Ok(score),
        ScoreLookup::NotFound => Ok(DEFAULT_SCORE),
    }
}

/// Overwrite the score for `ip`. No-op when the address has no record yet.
///
/// # Errors
///
/// Returns an error when the update fails.
pub async fn set_score(pool: &SqlitePool, ip: &str, score: i64) -> Result<()> {
    let query = "UPDATE ips SET score = ? WHERE ip = ?";
    let span = tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(score)
        .bind(ip)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update reputation score")?;

    Ok(())
}
