use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::refresh::RefreshCoordinator;
use crate::token::TokenStore;

mod impls;
mod response;

pub(crate) const USER_AGENT: &str = concat!("guardian-session/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the guardian-auth backend that owns the session lifecycle.
///
/// Clones share the token store and the refresh coordinator, so a refresh triggered through one
/// clone is observed by all of them. Separate `SessionClient::new` calls never share state.
#[derive(Clone)]
pub struct SessionClient {
    http: Client,
    config: Arc<Config>,
    store: Arc<TokenStore>,
    refresh: Arc<RefreshCoordinator>,
}
