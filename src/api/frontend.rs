//! SPA delivery for everything no API route claims.
//!
//! Production serves the compiled bundle from disk with an `index.html`
//! fallback for client-side routes. Development proxies to the frontend
//! dev server so hot reload keeps working behind the gate.

use anyhow::{anyhow, Result};
use axum::{
    body::Body,
    extract::{Extension, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use std::sync::Arc;
use tower::util::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::error;
use url::Url;

use crate::cli::globals::GlobalArgs;
use crate::APP_USER_AGENT;

// axum fallback handler, gated like every route
pub async fn fallback(
    Extension(globals): Extension<Arc<GlobalArgs>>,
    request: Request,
) -> Response {
    if globals.environment.is_prod() {
        serve_bundle(&globals, request).await
    } else {
        proxy(&globals, request).await
    }
}

async fn serve_bundle(globals: &GlobalArgs, request: Request) -> Response {
    let service = ServeDir::new(&globals.frontend_dir)
        .not_found_service(ServeFile::new(globals.frontend_dir.join("index.html")));

    match service.oneshot(request).await {
        Ok(response) => response.map(Body::new).into_response(),
        Err(infallible) => match infallible {},
    }
}

async fn proxy(globals: &GlobalArgs, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let target = parts
        .uri
        .path_and_query()
        .map_or(parts.uri.path(), |pq| pq.as_str());

    let url = match upstream_url(&globals.frontend_dev_url, target) {
        Ok(url) => url,
        Err(err) => {
            error!("Invalid frontend dev URL: {err}");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("Failed to read request body for proxying: {err}");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let mut headers = parts.headers;
    headers.remove(header::HOST);
    // The response is re-framed below, so ask for an uncompressed body
    headers.remove(header::ACCEPT_ENCODING);

    let client = match Client::builder().user_agent(APP_USER_AGENT).build() {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to build proxy client: {err}");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let upstream = match client
        .request(parts.method, &url)
        .headers(headers)
        .body(bytes)
        .send()
        .await
    {
        Ok(upstream) => upstream,
        Err(err) => {
            error!("Frontend dev server unreachable at {url}: {err}");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status = upstream.status();
    let mut upstream_headers = upstream.headers().clone();
    for name in [
        header::CONTENT_ENCODING,
        header::CONTENT_LENGTH,
        header::TRANSFER_ENCODING,
        header::CONNECTION,
    ] {
        upstream_headers.remove(&name);
    }

    let body = match upstream.bytes().await {
        Ok(body) => body,
        Err(err) => {
            error!("Failed to read dev server response: {err}");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let mut response = (status, body).into_response();
    response.headers_mut().extend(upstream_headers);

    response
}

// Normalizes the dev server address so a trailing slash or missing port
// never breaks the proxied path
fn upstream_url(base: &str, target: &str) -> Result<String> {
    let url = Url::parse(base)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("no host in frontend dev URL"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("unsupported scheme: {scheme}")),
        },
    };

    Ok(format!("{scheme}://{host}:{port}{target}"))
}
