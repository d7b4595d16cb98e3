//! # Pordisto (Account Gatekeeper)
//!
//! `pordisto` sits in front of a small account service and decides, per
//! request, whether the caller may reach any route logic at all. Every
//! request is scored against a persistent per-IP reputation store before
//! dispatch; a score of `0` short-circuits into a ban page. Admitted traffic
//! reaches exactly two authenticated flows:
//!
//! - **Account intake**: registration submissions are validated, stamped
//!   with caller metadata, and queued for manual approval. No account is
//!   created synchronously.
//! - **Login**: a three-factor check where the submitted password is rehashed
//!   with the stored salt (PBKDF2-HMAC-SHA256, 100,000 iterations), compared
//!   against the stored hash, and the submitted one-time code is validated
//!   against the stored TOTP secret.
//!
//! ## Failure discipline
//!
//! Unknown account, wrong password, and wrong one-time code are
//! indistinguishable from outside: one generic message, identical status and
//! body bytes. The specific cause is logged internally for operators and
//! never leaves the process.
//!
//! ## Identifiers
//!
//! Salts and random tokens are drawn through a ledger of every identifier
//! ever issued (`used_ids`); uniqueness is enforced by the storage layer's
//! primary key, so concurrent callers cannot claim the same value.

pub mod api;
pub mod cli;
pub mod idgen;
pub mod reputation;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Timestamp layout shared by the identifier ledger and intake records
pub const DATE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Local wall-clock time in the ledger layout
#[must_use]
pub fn current_timestamp() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}
