/// 缓存键模块
pub mod session_keys;

pub use session_keys::{admin_session_key, session_digest};
