//! read configuration from a file, the environment, or explicit values

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:6123/guardian-auth/v1";
pub const DEFAULT_EXPIRY_CODES: [i64; 2] = [17003, 17004];
pub const DEFAULT_TWO_FACTOR_CODES: [i64; 2] = [17007, 17008];
pub const DEFAULT_ACCESS_COOKIE_MAX_AGE_SECS: u64 = 900;

/// Backend paths, relative to [`Config::base_url`].
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub logout: String,
    pub refresh: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            logout: "/auth/logout".to_string(),
            refresh: "/auth/refresh".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub endpoints: Endpoints,
    /// Envelope codes meaning "access token expired or invalid". Treated alike.
    #[serde(default = "default_expiry_codes")]
    pub expiry_codes: Vec<i64>,
    #[serde(default = "default_two_factor_codes")]
    pub two_factor_codes: Vec<i64>,
    /// Used for the access cookie when the backend does not report `expires_in`.
    #[serde(default = "default_cookie_max_age")]
    pub access_cookie_max_age_secs: u64,
    /// Persist the session as JSON at this path; in-memory when unset.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_expiry_codes() -> Vec<i64> {
    DEFAULT_EXPIRY_CODES.to_vec()
}

fn default_two_factor_codes() -> Vec<i64> {
    DEFAULT_TWO_FACTOR_CODES.to_vec()
}

fn default_cookie_max_age() -> u64 {
    DEFAULT_ACCESS_COOKIE_MAX_AGE_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoints: Endpoints::default(),
            expiry_codes: default_expiry_codes(),
            two_factor_codes: default_two_factor_codes(),
            access_cookie_max_age_secs: default_cookie_max_age(),
            token_file: None,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// # ENV Vars
    /// * `GUARDIAN_API_BASE_URL` - backend base URL, defaults to [`DEFAULT_BASE_URL`]
    /// * `GUARDIAN_TOKEN_FILE` - optional path for the persisted session
    /// * `GUARDIAN_EXPIRY_CODES` - comma-separated envelope codes that trigger a refresh
    /// * `GUARDIAN_ACCESS_COOKIE_MAX_AGE` - fallback cookie max-age in seconds
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Config::default();
        if let Ok(url) = std::env::var("GUARDIAN_API_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(path) = std::env::var("GUARDIAN_TOKEN_FILE")
            && !path.is_empty()
        {
            config.token_file = Some(PathBuf::from(path));
        }
        if let Ok(codes) = std::env::var("GUARDIAN_EXPIRY_CODES") {
            config.expiry_codes = parse_codes(&codes)?;
        }
        if let Ok(max_age) = std::env::var("GUARDIAN_ACCESS_COOKIE_MAX_AGE") {
            config.access_cookie_max_age_secs = max_age.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "GUARDIAN_ACCESS_COOKIE_MAX_AGE must be a number of seconds, got '{}'",
                    max_age
                ))
            })?;
        }
        Ok(config)
    }

    pub fn from_values(base_url: impl Into<String>, token_file: Option<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            token_file,
            ..Self::default()
        }
    }

    /// Joins the base URL with an endpoint path, tolerating slashes on either side.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        reqwest::Url::parse(&self.base_url).map_err(|e| {
            Error::Config(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;
        if self.expiry_codes.is_empty() {
            return Err(Error::Config("At least one expiry code is required".into()));
        }
        if self.expiry_codes.contains(&200) {
            return Err(Error::Config("Code 200 cannot signal token expiry".into()));
        }
        Ok(())
    }
}

fn parse_codes(raw: &str) -> Result<Vec<i64>, Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| Error::Config(format!("Invalid response code '{}'", s)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_config_fills_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "base_url": "http://api.local/v1/" }"#)
            .expect("config parses");
        assert_eq!(cfg.expiry_codes, vec![17003, 17004]);
        assert_eq!(cfg.endpoints.refresh, "/auth/refresh");
        assert_eq!(cfg.url_for("/auth/login"), "http://api.local/v1/auth/login");
    }

    #[test]
    fn parse_codes_rejects_garbage() {
        assert_eq!(parse_codes("17003, 17004,").unwrap(), vec![17003, 17004]);
        assert!(matches!(parse_codes("17003,abc"), Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_url_and_success_code() {
        let bad_url = Config::from_values("not a url", None);
        assert!(matches!(bad_url.validate(), Err(Error::Config(_))));

        let mut bad_codes = Config::default();
        bad_codes.expiry_codes = vec![200];
        assert!(matches!(bad_codes.validate(), Err(Error::Config(_))));
    }
}
