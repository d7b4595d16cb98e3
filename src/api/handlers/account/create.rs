//! Account enrollment endpoints.
//!
//! The browser drives a three-step flow: fetch a shared secret, fetch a
//! single-use salt, then submit the intake form. Credential material
//! arrives pre-derived; approval happens out of band.

use axum::{
    extract::{ConnectInfo, Extension},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use tracing::{error, info};

use super::storage::{self, NewRegistration};
use super::types::{RegistrationRequest, AWAITING_APPROVAL, INVALID_REQUEST};
use super::verify;
use crate::api::handlers::{client_ip, extract_browser};
use crate::idgen;

#[utoipa::path(
    get,
    path = "/api/v1/account/create/totp",
    responses(
        (status = 200, description = "Fresh base32 shared secret", body = String),
        (status = 500, description = "Secret generation failed")
    ),
    tag = "account"
)]
// axum handler minting a shared secret for an enrollment in progress
pub async fn totp() -> impl IntoResponse {
    match verify::generate_shared_secret() {
        Ok(secret) => (StatusCode::OK, secret).into_response(),
        Err(err) => {
            error!("Failed to generate shared secret: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/account/create/salt",
    responses(
        (status = 200, description = "Fresh single-use salt", body = String),
        (status = 500, description = "Salt generation failed")
    ),
    tag = "account"
)]
// axum handler minting a single-use salt
pub async fn salt(Extension(pool): Extension<SqlitePool>) -> impl IntoResponse {
    match idgen::generate_salt(&pool).await {
        Ok(salt) => (StatusCode::OK, salt).into_response(),
        Err(err) => {
            error!("Failed to generate salt: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/account/create",
    request_body = RegistrationRequest,
    responses(
        (status = 200, description = "Submission recorded, account awaiting approval"),
        (status = 400, description = "Missing or incomplete payload"),
        (status = 500, description = "Submission could not be recorded")
    ),
    tag = "account"
)]
// axum handler for the intake form
pub async fn create(
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(pool): Extension<SqlitePool>,
    payload: Option<Json<RegistrationRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return invalid_request();
    };

    if !request.complete() {
        return invalid_request();
    }

    // Re-serializing the typed payload drops any keys the form never defined
    let payload = match serde_json::to_string(&request) {
        Ok(payload) => payload,
        Err(err) => {
            error!("Failed to serialize intake payload: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let ip = client_ip(&headers, addr);
    let browser = extract_browser(
        headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok()),
    );

    let registration = NewRegistration::new(payload, ip, browser);
    if let Err(err) = storage::insert_registration(&pool, &registration).await {
        error!("Failed to record registration: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    info!(
        target: "account_creation",
        id = %registration.id,
        ip = %registration.ip,
        browser = %registration.browser,
        payload = %registration.payload,
        "New account submission"
    );

    (StatusCode::OK, Json(json!({"success": AWAITING_APPROVAL}))).into_response()
}

fn invalid_request() -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": INVALID_REQUEST})),
    )
        .into_response()
}
