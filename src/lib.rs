//! Session and token lifecycle for guardian-auth admin clients: token storage, bearer
//! requests, and a single shared refresh when the backend reports an expired token.

mod client;
pub mod config;
pub mod errors;
pub mod refresh;
pub mod routes;
pub mod telemetry;
pub mod token;
pub mod types;

pub use client::SessionClient;
pub use config::{Config, Endpoints};
pub use errors::{Error, RefreshFailure};
pub use routes::{RouteDecision, RouteGuard};
pub use token::{FileStorage, MemoryStorage, SessionStorage, TokenStore};
pub use types::{LoginRequest, LoginResponse};

#[cfg(test)]
mod tests;
