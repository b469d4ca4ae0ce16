// 缓存模块
// 进程内限流窗口与会话存储

pub mod keys;
pub mod models;
pub mod operations;

pub use models::{CachedSession, RateLimitDecision, RateWindow};
pub use operations::{CounterMode, SessionError, SessionStore, SlidingWindowCounter};
