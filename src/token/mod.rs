mod cookie;
mod session;
mod storage;
mod store;

pub use cookie::{ACCESS_COOKIE_NAME, AccessCookie, access_token_from_header};
pub use session::Session;
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::TokenStore;
