pub mod account;

pub mod health;
pub use self::health::health;

// common functions for the handlers
use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Client address for a request: the last entry of the forwarded chain (the
/// hop closest to this server), falling back to the socket address. Earlier
/// entries are client-supplied and trivially forged.
#[must_use]
pub fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next_back())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| addr.ip().to_string(), str::to_string)
}

/// Coarse platform-browser pair sniffed from the User-Agent, recorded with
/// intake submissions ("windows-chrome", "unknown-unknown", ...)
#[must_use]
pub fn extract_browser(user_agent: Option<&str>) -> String {
    let Some(agent) = user_agent else {
        return "unknown-unknown".to_string();
    };
    let agent = agent.to_lowercase();

    // Android includes "linux", Chrome includes "safari": order matters
    let platform = if agent.contains("windows") {
        "windows"
    } else if agent.contains("android") {
        "android"
    } else if agent.contains("iphone") {
        "iphone"
    } else if agent.contains("ipad") {
        "ipad"
    } else if agent.contains("cros") {
        "chromeos"
    } else if agent.contains("mac os x") || agent.contains("macintosh") {
        "macos"
    } else if agent.contains("linux") {
        "linux"
    } else {
        "unknown"
    };

    let browser = if agent.contains("edg") {
        "edge"
    } else if agent.contains("opr") || agent.contains("opera") {
        "opera"
    } else if agent.contains("firefox") || agent.contains("fxios") {
        "firefox"
    } else if agent.contains("chrome") || agent.contains("crios") {
        "chrome"
    } else if agent.contains("safari") {
        "safari"
    } else if agent.contains("msie") || agent.contains("trident") {
        "msie"
    } else {
        "unknown"
    };

    format!("{platform}-{browser}")
}
