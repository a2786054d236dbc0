use std::sync::Arc;

use jiff::Timestamp;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::SessionClient;
use super::response::{Reply, classify, decode, read_envelope};
use crate::config::Config;
use crate::errors::{Error, RefreshFailure};
use crate::refresh::RefreshCoordinator;
use crate::routes;
use crate::token::{FileStorage, MemoryStorage, SessionStorage, TokenStore};
use crate::types::{
    LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, RefreshResponse, SUCCESS_CODE,
};

impl SessionClient {
    /// Create a new SessionClient.
    /// # Arguments
    /// * `config` - typically loaded via `Config::from_file` or `Config::from_env`. The session is
    ///   persisted to `config.token_file` when set, otherwise kept in memory.
    pub fn new(config: Config) -> Result<Self, Error> {
        let storage: Arc<dyn SessionStorage> = match config.token_file.as_ref() {
            Some(path) => Arc::new(FileStorage::new(path.clone())),
            None => Arc::new(MemoryStorage::new()),
        };
        Self::with_storage(config, storage)
    }

    /// Create a SessionClient over a caller-provided storage backend.
    pub fn with_storage(config: Config, storage: Arc<dyn SessionStorage>) -> Result<Self, Error> {
        config.validate()?;
        let http = Client::builder().user_agent(super::USER_AGENT).build()?;
        let store = TokenStore::open(storage, config.access_cookie_max_age_secs)?;
        info!(base_url = %config.base_url, "session client ready");
        Ok(Self {
            http,
            config: Arc::new(config),
            store: Arc::new(store),
            refresh: Arc::new(RefreshCoordinator::new()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    /// Logs in and stores both tokens. Codes signalling a missing 2FA code surface as
    /// [`Error::TwoFactorRequired`].
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, Error> {
        let response: LoginResponse = self.post(&self.config.endpoints.login, request).await?;
        self.store
            .set_tokens(
                &response.access_token,
                &response.refresh_token,
                Some(response.expires_in),
            )
            .await?;
        self.refresh.forget_issued();
        info!(
            username = %request.username,
            two_fa = request.two_fa_code.is_some(),
            expires_in = response.expires_in,
            "login.ok"
        );
        Ok(response)
    }

    /// Revokes the refresh token on the backend when possible; local tokens are always cleared.
    pub async fn logout(&self) -> Result<(), Error> {
        if let Some(refresh_token) = self.store.refresh_token().await {
            let body = LogoutRequest {
                refresh_token: &refresh_token,
            };
            if let Err(err) = self
                .post::<Value, _>(&self.config.endpoints.logout, &body)
                .await
            {
                warn!(error = %err, "logout.remote_failed");
            }
        }
        self.store.clear().await?;
        self.refresh.forget_issued();
        info!("logout.ok");
        Ok(())
    }

    /// Whether the mirrored access cookie holds a live, unexpired JWT.
    pub async fn is_authenticated(&self) -> bool {
        match self.store.access_cookie().await {
            Some(cookie) => cookie.is_live(Timestamp::now()) && routes::is_valid_token(cookie.value()),
            None => false,
        }
    }

    /// Forces a refresh, sharing any refresh already in flight.
    pub async fn refresh_session(&self) -> Result<String, Error> {
        self.refresh_access_token("refresh_session", None).await
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        self.send_plain(Method::GET, endpoint, None).await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.send_plain(Method::POST, endpoint, Some(body)).await
    }

    pub async fn get_with_auth<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        self.send_with_auth(Method::GET, endpoint, None).await
    }

    pub async fn post_with_auth<T, B>(&self, endpoint: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.send_with_auth(Method::POST, endpoint, Some(body)).await
    }

    pub async fn put_with_auth<T, B>(&self, endpoint: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.send_with_auth(Method::PUT, endpoint, Some(body)).await
    }

    pub async fn delete_with_auth<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        self.send_with_auth(Method::DELETE, endpoint, None).await
    }

    async fn send_plain<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T, Error> {
        match self.dispatch(method, endpoint, body.as_ref(), None).await? {
            Reply::Data(data) => decode(data),
            Reply::Expired { code, message } => Err(Error::Api {
                code,
                message: message.unwrap_or_else(|| "Request failed".to_string()),
                data: None,
            }),
        }
    }

    /// Sends with the stored bearer token. An expiry reply triggers one shared refresh and one
    /// retry; an expiry reply after a refresh clears the session and is terminal.
    async fn send_with_auth<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T, Error> {
        let (mut token, mut refreshed) = match self.store.access_token().await {
            Some(token) => (token, false),
            None => {
                debug!(endpoint, "auth.no_access_token");
                (self.refresh_access_token(endpoint, None).await?, true)
            }
        };

        loop {
            match self
                .dispatch(method.clone(), endpoint, body.as_ref(), Some(&token))
                .await?
            {
                Reply::Data(data) => return decode(data),
                Reply::Expired { code, .. } if refreshed => {
                    error!(endpoint, code, "auth.rejected_after_refresh");
                    self.store.clear().await?;
                    return Err(RefreshFailure::RejectedAfterRefresh { code }.into());
                }
                Reply::Expired { code, .. } => {
                    warn!(endpoint, code, "auth.token_rejected");
                    token = self.refresh_access_token(endpoint, Some(&token)).await?;
                    refreshed = true;
                }
            }
        }
    }

    /// Returns a usable access token after `stale` was rejected. When another request has
    /// already replaced `stale`, that token is reused without a new round-trip. The store check
    /// is a fast path; the coordinator repeats it under its own lock.
    async fn refresh_access_token(&self, waiter: &str, stale: Option<&str>) -> Result<String, Error> {
        if let Some(stale) = stale
            && let Some(current) = self.store.access_token().await
            && current != stale
        {
            debug!(waiter, "auth.token_already_refreshed");
            return Ok(current);
        }

        let http = self.http.clone();
        let url = self.config.url_for(&self.config.endpoints.refresh);
        let store = Arc::clone(&self.store);
        let token = self
            .refresh
            .refresh(waiter, stale, move || refresh_once(http, url, store))
            .await?;
        Ok(token)
    }

    async fn dispatch(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Reply, Error> {
        let url = self.config.url_for(endpoint);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request.send().await.inspect_err(|err| {
            error!(%method, endpoint, error = %err, "request.transport_failed");
        })?;
        let envelope = read_envelope(resp).await?;
        debug!(%method, endpoint, code = envelope.code, "request.completed");
        classify(envelope, &self.config)
    }
}

/// One refresh round-trip. Persists the new token on success and clears the session on any
/// failure, so every waiter sharing this future sees the store already settled.
async fn refresh_once(
    http: Client,
    url: String,
    store: Arc<TokenStore>,
) -> Result<String, RefreshFailure> {
    let outcome = exchange_and_store(&http, &url, &store).await;
    if outcome.is_err()
        && let Err(err) = store.clear().await
    {
        warn!(error = %err, "token_store.clear_failed");
    }
    outcome
}

async fn exchange_and_store(
    http: &Client,
    url: &str,
    store: &TokenStore,
) -> Result<String, RefreshFailure> {
    let refresh_token = store
        .refresh_token()
        .await
        .ok_or(RefreshFailure::MissingRefreshToken)?;
    let refreshed = exchange_refresh_token(http, url, &refresh_token).await?;
    store
        .set_access_token(&refreshed.access_token, refreshed.expires_in)
        .await
        .map_err(|e| RefreshFailure::Storage(e.to_string()))?;
    if let Some(rotated) = refreshed.refresh_token {
        store
            .set_refresh_token(rotated)
            .await
            .map_err(|e| RefreshFailure::Storage(e.to_string()))?;
    }
    Ok(refreshed.access_token)
}

async fn exchange_refresh_token(
    http: &Client,
    url: &str,
    refresh_token: &str,
) -> Result<RefreshResponse, RefreshFailure> {
    let resp = http
        .post(url)
        .json(&RefreshRequest { refresh_token })
        .send()
        .await
        .map_err(|e| RefreshFailure::Transport(e.to_string()))?;
    let envelope = read_envelope(resp)
        .await
        .map_err(|e| RefreshFailure::Transport(e.to_string()))?;
    if envelope.code != SUCCESS_CODE {
        return Err(RefreshFailure::Rejected {
            code: envelope.code,
            message: envelope.msg.unwrap_or_else(|| "Refresh failed".to_string()),
        });
    }
    let data = envelope
        .data
        .ok_or_else(|| RefreshFailure::Transport("refresh response carried no data".into()))?;
    serde_json::from_value(data).map_err(|e| RefreshFailure::Transport(e.to_string()))
}
