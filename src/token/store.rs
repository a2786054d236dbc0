use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::Error;

use super::{AccessCookie, MemoryStorage, Session, SessionStorage};

/// Token storage: the persisted session plus the mirrored access cookie.
///
/// Purely storage; callers decide what an expired token means.
pub struct TokenStore {
    storage: Arc<dyn SessionStorage>,
    session: RwLock<Session>,
    cookie: RwLock<Option<AccessCookie>>,
    cookie_max_age_secs: u64,
}

impl TokenStore {
    /// Loads any previously persisted session from `storage`.
    pub fn open(storage: Arc<dyn SessionStorage>, cookie_max_age_secs: u64) -> Result<Self, Error> {
        let session = storage.load()?.unwrap_or_default();
        let cookie = restore_cookie(&session, cookie_max_age_secs, Timestamp::now());
        debug!(
            has_access = session.access_token().is_some(),
            has_refresh = session.refresh_token().is_some(),
            "token_store.opened"
        );
        Ok(Self {
            storage,
            session: RwLock::new(session),
            cookie: RwLock::new(cookie),
            cookie_max_age_secs,
        })
    }

    pub fn in_memory(cookie_max_age_secs: u64) -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            session: RwLock::new(Session::default()),
            cookie: RwLock::new(None),
            cookie_max_age_secs,
        }
    }

    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.session.read().await.access_token().map(str::to_string)
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.session.read().await.refresh_token().map(str::to_string)
    }

    pub async fn access_cookie(&self) -> Option<AccessCookie> {
        self.cookie.read().await.clone()
    }

    /// Stores a new access token. `expires_in` is in seconds and also bounds the cookie.
    pub async fn set_access_token(
        &self,
        token: impl Into<String>,
        expires_in: Option<u64>,
    ) -> Result<(), Error> {
        let token = token.into();
        let now = Timestamp::now();
        let mut session = self.session.write().await;
        session.set_access_token(token.clone(), expires_in, now);
        self.persist(&session).await?;
        let max_age = expires_in.unwrap_or(self.cookie_max_age_secs);
        *self.cookie.write().await = Some(AccessCookie::new(token, max_age, now));
        Ok(())
    }

    pub async fn set_refresh_token(&self, token: impl Into<String>) -> Result<(), Error> {
        let mut session = self.session.write().await;
        session.set_refresh_token(token.into());
        self.persist(&session).await
    }

    /// Stores both tokens at once, as after a login.
    pub async fn set_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: Option<u64>,
    ) -> Result<(), Error> {
        let access_token = access_token.into();
        let now = Timestamp::now();
        let mut session = self.session.write().await;
        session.set_access_token(access_token.clone(), expires_in, now);
        session.set_refresh_token(refresh_token.into());
        self.persist(&session).await?;
        let max_age = expires_in.unwrap_or(self.cookie_max_age_secs);
        *self.cookie.write().await = Some(AccessCookie::new(access_token, max_age, now));
        Ok(())
    }

    pub async fn clear_access_token(&self) -> Result<(), Error> {
        let mut session = self.session.write().await;
        session.clear_access_token();
        self.persist(&session).await?;
        *self.cookie.write().await = None;
        Ok(())
    }

    pub async fn clear_refresh_token(&self) -> Result<(), Error> {
        let mut session = self.session.write().await;
        session.clear_refresh_token();
        self.persist(&session).await
    }

    /// Drops both tokens and the cookie. Safe to call repeatedly.
    pub async fn clear(&self) -> Result<(), Error> {
        let mut session = self.session.write().await;
        *session = Session::default();
        self.persist(&session).await?;
        *self.cookie.write().await = None;
        debug!("token_store.cleared");
        Ok(())
    }

    /// Writes through to storage on the blocking pool. Callers hold the session write guard
    /// across this, so writes land in the order they were made.
    async fn persist(&self, session: &Session) -> Result<(), Error> {
        let storage = Arc::clone(&self.storage);
        let snapshot = (!session.is_empty()).then(|| session.clone());
        tokio::task::spawn_blocking(move || match snapshot {
            Some(session) => storage.save(&session),
            None => storage.remove(),
        })
        .await
        .map_err(|err| Error::Storage(format!("storage task failed: {err}")))?
    }
}

fn restore_cookie(session: &Session, default_max_age: u64, now: Timestamp) -> Option<AccessCookie> {
    let token = session.access_token()?;
    let max_age = match session.expiry() {
        Some(_) => session.remaining(now)?.as_secs().max(0) as u64,
        None => default_max_age,
    };
    Some(AccessCookie::new(token, max_age, now))
}
