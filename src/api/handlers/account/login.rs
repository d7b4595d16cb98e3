//! Login endpoint, the only place where stored credentials are read.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{error, info};

use super::storage;
use super::types::{LoginRequest, GENERIC_LOGIN_ERROR, INVALID_REQUEST};
use super::verify::{self, LoginOutcome};

#[utoipa::path(
    post,
    path = "/api/v1/account/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "All three checks passed, returns salt and cipher"),
        (status = 400, description = "Invalid payload or failed verification"),
        (status = 500, description = "Credential store unavailable")
    ),
    tag = "account"
)]
// axum handler for login
pub async fn login(
    Extension(pool): Extension<SqlitePool>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return invalid_request();
    };

    let present = |field: &Option<String>| {
        field
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let (Some(email), Some(code), Some(password)) = (
        present(&request.email),
        present(&request.code),
        present(&request.password),
    ) else {
        return invalid_request();
    };

    let record = match storage::lookup_credentials(&pool, &email).await {
        Ok(record) => record,
        Err(err) => {
            error!("Credential lookup failed: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    respond(&email, verify::verify(record.as_ref(), &password, &code))
}

/// Single point where internal outcomes become responses. Every failure
/// collapses into one body; which check failed is only ever logged.
fn respond(email: &str, outcome: LoginOutcome) -> Response {
    match outcome {
        LoginOutcome::Success { salt, cipher } => (
            StatusCode::OK,
            Json(json!({"success": "success", "salt": salt, "cipher": cipher})),
        )
            .into_response(),
        LoginOutcome::UserNotFound => {
            info!("No user with email `{email}` was found.");
            generic_failure()
        }
        LoginOutcome::PasswordMismatch => {
            info!("A wrong password was entered for the user `{email}`.");
            generic_failure()
        }
        LoginOutcome::CodeMismatch => {
            info!("A wrong TOTP code was entered for the user `{email}`.");
            generic_failure()
        }
    }
}

fn generic_failure() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": GENERIC_LOGIN_ERROR})),
    )
        .into_response()
}

fn invalid_request() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": INVALID_REQUEST})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn parts(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_failures_are_indistinguishable() {
        let not_found = parts(respond("ada@example.com", LoginOutcome::UserNotFound)).await;
        let bad_password = parts(respond("ada@example.com", LoginOutcome::PasswordMismatch)).await;
        let bad_code = parts(respond("ada@example.com", LoginOutcome::CodeMismatch)).await;

        assert_eq!(not_found.0, StatusCode::BAD_REQUEST);
        assert_eq!(not_found, bad_password);
        assert_eq!(bad_password, bad_code);
        assert!(not_found.1.contains(GENERIC_LOGIN_ERROR));
    }

    #[tokio::test]
    async fn test_success_returns_salt_and_cipher() {
        let outcome = LoginOutcome::Success {
            salt: "stored-salt".to_string(),
            cipher: "encrypted-blob".to_string(),
        };
        let (status, body) = parts(respond("ada@example.com", outcome)).await;
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], "success");
        assert_eq!(body["salt"], "stored-salt");
        assert_eq!(body["cipher"], "encrypted-blob");
    }
}
