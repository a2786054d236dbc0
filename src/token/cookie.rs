use jiff::{SignedDuration, Timestamp};

pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Short-lived mirror of the access token used for route gating. Not a security boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessCookie {
    value: String,
    issued_at: Timestamp,
    max_age: SignedDuration,
}

impl AccessCookie {
    pub fn new(value: impl Into<String>, max_age_secs: u64, issued_at: Timestamp) -> Self {
        let max_age = SignedDuration::from_secs(i64::try_from(max_age_secs).unwrap_or(i64::MAX));
        Self {
            value: value.into(),
            issued_at,
            max_age,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn max_age(&self) -> SignedDuration {
        self.max_age
    }

    pub fn expires_at(&self) -> Timestamp {
        self.issued_at
            .checked_add(self.max_age)
            .unwrap_or(Timestamp::MAX)
    }

    pub fn is_live(&self, now: Timestamp) -> bool {
        now < self.expires_at()
    }

    /// `Set-Cookie` value that installs the mirror.
    pub fn set_cookie_header(&self) -> String {
        format!(
            "{}={}; Path=/; Max-Age={}; SameSite=Lax",
            ACCESS_COOKIE_NAME,
            urlencoding::encode(&self.value),
            self.max_age.as_secs()
        )
    }

    /// `Set-Cookie` value that deletes the mirror.
    pub fn removal_header() -> String {
        format!("{}=; Path=/; Max-Age=0; SameSite=Lax", ACCESS_COOKIE_NAME)
    }
}

/// Extracts the access token from a `Cookie` request header.
pub fn access_token_from_header(header: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name != ACCESS_COOKIE_NAME || value.is_empty() {
            return None;
        }
        urlencoding::decode(value).ok().map(|v| v.into_owned())
    })
}
