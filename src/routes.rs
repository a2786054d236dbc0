//! Navigation gating from the mirrored `access_token` cookie.
//!
//! The cookie check is a routing hint. Signatures are not verified here; the backend remains the
//! authority on every request.

use jiff::Timestamp;
use jsonwebtoken::{DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use crate::token::{AccessCookie, access_token_from_header};

pub const LOGIN_ROUTE: &str = "/login";
pub const HOME_ROUTE: &str = "/dashboard";
pub const PUBLIC_ROUTES: [&str; 2] = ["/login", "/2fa"];
pub const PROTECTED_ROUTES: [&str; 4] = ["/dashboard", "/admins", "/roles", "/permissions"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Continue,
    Redirect {
        location: String,
        /// The request carried an unusable cookie that should be deleted.
        clear_access_cookie: bool,
    },
}

impl RouteDecision {
    fn redirect(location: &str, clear_access_cookie: bool) -> Self {
        RouteDecision::Redirect {
            location: location.to_string(),
            clear_access_cookie,
        }
    }

    /// `Set-Cookie` value to send along with the decision, if the cookie must be deleted.
    pub fn set_cookie_header(&self) -> Option<String> {
        match self {
            RouteDecision::Redirect {
                clear_access_cookie: true,
                ..
            } => Some(AccessCookie::removal_header()),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

#[derive(Clone, Debug)]
pub struct RouteGuard {
    public: Vec<String>,
    protected: Vec<String>,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(PUBLIC_ROUTES, PROTECTED_ROUTES)
    }
}

impl RouteGuard {
    pub fn new<P, Q>(public: P, protected: Q) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        Q: IntoIterator,
        Q::Item: Into<String>,
    {
        Self {
            public: public.into_iter().map(Into::into).collect(),
            protected: protected.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|route| route == path)
    }

    /// Protected routes cover their sub-paths (`/admins/12`), not sibling names (`/adminsx`).
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|route| {
            path == route
                || path
                    .strip_prefix(route.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn evaluate(&self, path: &str, token: Option<&str>) -> RouteDecision {
        let valid = token.is_some_and(is_valid_token);
        let decision = if path == "/" {
            RouteDecision::redirect(if valid { HOME_ROUTE } else { LOGIN_ROUTE }, false)
        } else if self.is_public(path) {
            if valid {
                RouteDecision::redirect(HOME_ROUTE, false)
            } else {
                RouteDecision::Continue
            }
        } else if self.is_protected(path) && !valid {
            RouteDecision::redirect(LOGIN_ROUTE, token.is_some())
        } else {
            RouteDecision::Continue
        };
        debug!(path, has_token = token.is_some(), valid, ?decision, "route.evaluated");
        decision
    }

    /// Same as [`RouteGuard::evaluate`], reading the token from a raw `Cookie` header.
    pub fn evaluate_cookie_header(&self, path: &str, cookie_header: Option<&str>) -> RouteDecision {
        let token = cookie_header.and_then(access_token_from_header);
        self.evaluate(path, token.as_deref())
    }
}

/// True for a three-part JWT whose `exp` claim lies in the future.
pub fn is_valid_token(token: &str) -> bool {
    is_valid_token_at(token, Timestamp::now())
}

/// A token expiring exactly at `now` is already invalid.
fn is_valid_token_at(token: &str, now: Timestamp) -> bool {
    if token.split('.').count() != 3 {
        return false;
    }
    let Ok(header) = jsonwebtoken::decode_header(token) else {
        return false;
    };
    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp"]);
    match jsonwebtoken::decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => data.claims.exp > now.as_second(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;

    fn token_expiring_at(exp: i64) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            &serde_json::json!({ "sub": "admin", "exp": exp }),
            &EncodingKey::from_secret(b"any-secret"),
        )
        .unwrap()
    }

    fn token_expiring_in(secs: i64) -> String {
        token_expiring_at(Timestamp::now().as_second() + secs)
    }

    #[test]
    fn token_expiring_now_is_invalid() {
        let now = Timestamp::now();
        let token = token_expiring_at(now.as_second());
        assert!(!is_valid_token_at(&token, now));
        assert!(is_valid_token_at(&token_expiring_at(now.as_second() + 1), now));
    }

    #[test]
    fn only_unusable_cookies_are_deleted() {
        let guard = RouteGuard::default();
        let decision = guard.evaluate("/roles", Some("garbage"));
        assert_eq!(
            decision.set_cookie_header().as_deref(),
            Some("access_token=; Path=/; Max-Age=0; SameSite=Lax")
        );
        assert_eq!(guard.evaluate("/roles", None).set_cookie_header(), None);
        assert_eq!(guard.evaluate("/about", None).set_cookie_header(), None);
    }

    #[test]
    fn token_validity_checks_shape_and_expiry() {
        assert!(is_valid_token(&token_expiring_in(600)));
        assert!(!is_valid_token(&token_expiring_in(-600)));
        assert!(!is_valid_token("not-a-jwt"));
        assert!(!is_valid_token("a.b.c"));
    }

    #[test]
    fn root_redirects_by_token_state() {
        let guard = RouteGuard::default();
        let valid = token_expiring_in(600);
        assert_eq!(
            guard.evaluate("/", Some(valid.as_str())),
            RouteDecision::redirect("/dashboard", false)
        );
        assert_eq!(guard.evaluate("/", None), RouteDecision::redirect("/login", false));
    }

    #[test]
    fn public_routes_bounce_signed_in_users() {
        let guard = RouteGuard::default();
        let valid = token_expiring_in(600);
        assert_eq!(
            guard.evaluate("/2fa", Some(valid.as_str())),
            RouteDecision::redirect("/dashboard", false)
        );
        assert_eq!(guard.evaluate("/login", None), RouteDecision::Continue);
    }

    #[test]
    fn protected_routes_require_a_valid_token() {
        let guard = RouteGuard::default();
        let expired = token_expiring_in(-5);
        assert_eq!(
            guard.evaluate("/admins/12", Some(expired.as_str())),
            RouteDecision::redirect("/login", true)
        );
        assert_eq!(
            guard.evaluate("/roles", None),
            RouteDecision::redirect("/login", false)
        );
        let valid = token_expiring_in(600);
        assert_eq!(guard.evaluate("/permissions", Some(valid.as_str())), RouteDecision::Continue);
        assert_eq!(guard.evaluate("/adminsx", None), RouteDecision::Continue);
        assert_eq!(guard.evaluate("/about", None), RouteDecision::Continue);
    }

    #[test]
    fn cookie_header_is_parsed() {
        let guard = RouteGuard::default();
        let header = format!("theme=dark; access_token={}", token_expiring_in(600));
        assert_eq!(
            guard.evaluate_cookie_header("/dashboard", Some(header.as_str())),
            RouteDecision::Continue
        );
    }
}
