//! Payloads and the fixed response strings for the account endpoints.
//!
//! The failure strings are deliberately constant: which check failed is an
//! internal matter and must never shape the response.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body for malformed or incomplete payloads
pub const INVALID_REQUEST: &str = "Invalid request";

/// One message for unknown email, wrong password and wrong one-time code
pub const GENERIC_LOGIN_ERROR: &str = "e-mail not found, incorrect password or TOTP mismatch";

/// Body returned when an intake submission is accepted
pub const AWAITING_APPROVAL: &str = "Account awaiting approval";

/// Registration intake payload. Every field is required and must be
/// non-empty; the legal-name flag only has to be present.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub hash: Option<String>,
    pub salt: Option<String>,
    pub date_of_birth: Option<String>,
    pub title: Option<String>,
    pub gender: Option<String>,
    pub country: Option<String>,
    pub legal_name_different: Option<bool>,
    pub legal_first_name: Option<String>,
    pub legal_last_name: Option<String>,
    pub legal_gender: Option<String>,
    pub additional_information: Option<String>,
    pub cipher: Option<String>,
    pub totp: Option<String>,
}

impl RegistrationRequest {
    #[must_use]
    pub fn complete(&self) -> bool {
        let filled =
            |field: &Option<String>| field.as_deref().is_some_and(|value| !value.is_empty());

        filled(&self.first_name)
            && filled(&self.last_name)
            && filled(&self.email)
            && filled(&self.hash)
            && filled(&self.salt)
            && filled(&self.date_of_birth)
            && filled(&self.title)
            && filled(&self.gender)
            && filled(&self.country)
            && self.legal_name_different.is_some()
            && filled(&self.legal_first_name)
            && filled(&self.legal_last_name)
            && filled(&self.legal_gender)
            && filled(&self.additional_information)
            && filled(&self.cipher)
            && filled(&self.totp)
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    pub password: Option<String>,
}
