use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair plus the access token's expiry, as persisted by storage backends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<Timestamp>,
}

impl Session {
    /// Returns the raw token value suitable for Authorization headers.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expiry(&self) -> Option<Timestamp> {
        self.expiry
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// Time left before the access token expires, `None` when unknown or already past.
    pub fn remaining(&self, now: Timestamp) -> Option<SignedDuration> {
        let expiry = self.expiry?;
        let left = now.duration_until(expiry);
        if left.is_positive() { Some(left) } else { None }
    }

    pub(crate) fn set_access_token(&mut self, token: String, expires_in: Option<u64>, now: Timestamp) {
        self.expiry = expires_in.and_then(|secs| expiry_after(now, secs));
        self.access_token = Some(token);
    }

    pub(crate) fn set_refresh_token(&mut self, token: String) {
        self.refresh_token = Some(token);
    }

    pub(crate) fn clear_access_token(&mut self) {
        self.access_token = None;
        self.expiry = None;
    }

    pub(crate) fn clear_refresh_token(&mut self) {
        self.refresh_token = None;
    }
}

pub(crate) fn expiry_after(now: Timestamp, secs: u64) -> Option<Timestamp> {
    let secs = i64::try_from(secs).ok()?;
    now.checked_add(SignedDuration::from_secs(secs)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_none_once_expired() {
        let now = Timestamp::now();
        let mut session = Session::default();
        session.set_access_token("tok".into(), Some(60), now);
        assert_eq!(session.remaining(now), Some(SignedDuration::from_secs(60)));

        let later = now.checked_add(SignedDuration::from_secs(61)).unwrap();
        assert_eq!(session.remaining(later), None);
    }

    #[test]
    fn serialized_form_omits_missing_tokens() {
        let mut session = Session::default();
        session.set_refresh_token("r".into());
        let json = serde_json::to_string(&session).unwrap();
        assert_eq!(json, r#"{"refresh_token":"r"}"#);
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
