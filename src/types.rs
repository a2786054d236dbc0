use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SUCCESS_CODE: i64 = 200;

/// Envelope wrapping every backend response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T = Value> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_fa_code: Option<String>,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            two_fa_code: None,
        }
    }

    pub fn with_two_fa_code(mut self, code: impl Into<String>) -> Self {
        self.two_fa_code = Some(code.into());
        self
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct LogoutRequest<'a> {
    pub refresh_token: &'a str,
}
