//! Reputation gate in front of every route.
//!
//! Each request is scored before any handler runs: first sight of an
//! address creates a neutral record, score zero short-circuits to a ban
//! page, and oversized payloads are rejected before the body is touched.
//! Every response leaving the gate re-arms the sliding session cookie.

use anyhow::{Context, Result};
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::URL_SAFE, Engine};
use serde_json::json;
use sha3::{Digest, Sha3_512};
use sqlx::SqlitePool;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, error};

use super::{handlers::client_ip, session};
use crate::cli::globals::GlobalArgs;
use crate::reputation::{self, BANNED_SCORE};

/// Declared-length ceiling, enforced before any body handling
pub const MAX_CONTENT_LENGTH: u64 = 2 * 1024 * 1024;

/// The only headers the access log may carry
const RETAINED_HEADERS: [&str; 5] = [
    "host",
    "accept",
    "accept-language",
    "accept-encoding",
    "content-type",
];

const BAN_PAGE: &str = include_str!("../../resources/banned.html");

// axum middleware, wraps every route including the fallback
pub async fn scan(
    Extension(pool): Extension<SqlitePool>,
    Extension(globals): Extension<Arc<GlobalArgs>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(request.headers(), addr);
    let token = session::from_header(
        request
            .headers()
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok()),
        session::cookie_name(globals.environment),
    );

    let score = match reputation::observe(&pool, &ip).await {
        Ok(score) => score,
        Err(err) => {
            error!("Reputation store unavailable: {err}");
            let response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            return rearm(&globals, token.as_deref(), response);
        }
    };

    access_log(&request, &ip, score);

    if oversized(request.headers()) {
        let response = (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({"error": "Content too large"})),
        )
            .into_response();
        return rearm(&globals, token.as_deref(), response);
    }

    if score == BANNED_SCORE {
        let response =
            (StatusCode::FORBIDDEN, Html(BAN_PAGE.replace("{{ip}}", &ip))).into_response();
        return rearm(&globals, token.as_deref(), response);
    }

    rearm(&globals, token.as_deref(), next.run(request).await)
}

/// SHA3-512 digest of the packed address octets, base64url with padding.
/// The access log carries this instead of the raw address.
///
/// # Errors
///
/// Returns an error when `ip` is not a valid IPv4 or IPv6 address.
pub fn hash_ip(ip: &str) -> Result<String> {
    let packed = match ip.parse::<IpAddr>().context("invalid IP address")? {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    };

    Ok(URL_SAFE.encode(Sha3_512::digest(packed)))
}

fn oversized(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .is_some_and(|length| length > MAX_CONTENT_LENGTH)
}

/// One event per request, only allow-listed headers, digest instead of
/// the raw address. An undigestable address just drops the field.
fn access_log(request: &Request, ip: &str, score: i64) {
    let retained: Vec<String> = RETAINED_HEADERS
        .iter()
        .filter_map(|name| {
            let value = request.headers().get(*name)?.to_str().ok()?;
            Some(format!("{name}: {value}"))
        })
        .collect();

    match hash_ip(ip) {
        Ok(digest) => debug!(
            target: "access",
            method = %request.method(),
            path = %request.uri().path(),
            score,
            ip_digest = %digest,
            headers = ?retained,
            "request scored"
        ),
        Err(_) => debug!(
            target: "access",
            method = %request.method(),
            path = %request.uri().path(),
            score,
            headers = ?retained,
            "request scored"
        ),
    }
}

/// Attach the sliding session cookie to an outgoing response.
fn rearm(globals: &GlobalArgs, token: Option<&str>, mut response: Response) -> Response {
    match session::issue(globals, token) {
        Ok(cookie) => match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(err) => error!("Failed to encode session cookie: {err}"),
        },
        Err(err) => error!("Failed to issue session cookie: {err}"),
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::globals::Environment;
    use secrecy::SecretSlice;

    #[test]
    fn test_hash_ip_v4() {
        assert_eq!(
            hash_ip("127.0.0.1").unwrap(),
            "WNnZeKV-fEz_2M8VFvPGbruDR0V1tMJsjVX3Sokmk7Wy4ZUpdRy3Ms1W4DmcRrpalUgeCs5wizFGJmuBXAoRwA=="
        );
    }

    #[test]
    fn test_hash_ip_v6() {
        assert_eq!(
            hash_ip("::1").unwrap(),
            "q4fFJIJVjIyqP70LspTQcV547rwzhHMVDiPqbc1cByOEWXKbOubHR0lvBMc_Ashn1g-LmMET8KCPRNqolXVC9g=="
        );
    }

    #[test]
    fn test_hash_ip_rejects_garbage() {
        assert!(hash_ip("not-an-ip").is_err());
        assert!(hash_ip("").is_err());
    }

    #[test]
    fn test_oversized_boundary() {
        let mut headers = HeaderMap::new();
        assert!(!oversized(&headers));

        headers.insert(
            header::CONTENT_LENGTH,
            HeaderValue::from_str(&MAX_CONTENT_LENGTH.to_string()).unwrap(),
        );
        assert!(!oversized(&headers));

        headers.insert(
            header::CONTENT_LENGTH,
            HeaderValue::from_str(&(MAX_CONTENT_LENGTH + 1).to_string()).unwrap(),
        );
        assert!(oversized(&headers));

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("garbage"));
        assert!(!oversized(&headers));
    }

    #[test]
    fn test_rearm_sets_cookie() {
        let key = SecretSlice::from(vec![7_u8; 64]);
        let globals = GlobalArgs::new(Environment::Dev, key);

        let response = rearm(&globals, None, StatusCode::OK.into_response());
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();

        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("Max-Age=7948800"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_ban_page_interpolates_ip() {
        let page = BAN_PAGE.replace("{{ip}}", "203.0.113.7");

        assert!(page.contains("203.0.113.7"));
        assert!(!page.contains("{{ip}}"));
    }
}
