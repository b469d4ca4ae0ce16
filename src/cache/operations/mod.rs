/// 缓存操作
pub mod rate_limit;
pub mod session;

pub use rate_limit::{CounterMode, SlidingWindowCounter, now_millis};
pub use session::{
    JwtSessionStore, MemorySessionStore, RedisSessionStore, SessionError, SessionStore,
    generate_session_token,
};
