// 管理员会话
// 令牌签发与校验、持久化存储

mod manager;
pub mod store;
pub mod token;

pub use manager::{ADMIN_EMAIL_KEY, ADMIN_TOKEN_KEY, Session, SessionManager, TOKEN_EXPIRY_KEY};
pub use store::{FileStore, MemoryStore, SessionStore};
