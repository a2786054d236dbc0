use reqwest::StatusCode;
use serde_json::Value;

/// Why a refresh did not produce a usable access token.
///
/// Cloneable so that every request waiting on the same refresh sees the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshFailure {
    #[error("no refresh token stored")]
    MissingRefreshToken,
    #[error("refresh rejected by backend: code={code} msg='{message}'")]
    Rejected { code: i64, message: String },
    #[error("refresh transport failure: {0}")]
    Transport(String),
    #[error("failed to persist refreshed session: {0}")]
    Storage(String),
    #[error("token rejected again after refresh: code={code}")]
    RejectedAfterRefresh { code: i64 },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid response format (status {0})")]
    InvalidResponse(StatusCode),
    #[error("api error {code}: {message}")]
    Api {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("two-factor code required ({code}): {message}")]
    TwoFactorRequired { code: i64, message: String },
    #[error("session expired: {0}")]
    SessionExpired(RefreshFailure),
    #[error("config error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Application-level code carried by the error; invalid responses report 0.
    pub fn code(&self) -> Option<i64> {
        match self {
            Error::Api { code, .. } | Error::TwoFactorRequired { code, .. } => Some(*code),
            Error::InvalidResponse(_) => Some(0),
            Error::SessionExpired(RefreshFailure::Rejected { code, .. })
            | Error::SessionExpired(RefreshFailure::RejectedAfterRefresh { code }) => Some(*code),
            _ => None,
        }
    }

    /// True when the caller should send the user back to the login route.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired(_))
    }
}

impl From<RefreshFailure> for Error {
    fn from(failure: RefreshFailure) -> Self {
        Error::SessionExpired(failure)
    }
}
