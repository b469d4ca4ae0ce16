use serde::{Deserialize, Serialize};

/// 管理员会话缓存数据模型
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CachedSession {
    pub session_id: String, // 令牌摘要，不保存明文令牌
    pub principal: String,
    pub created_at: i64, // Unix timestamp
    pub expires_at: i64, // Unix timestamp
}

impl CachedSession {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}
