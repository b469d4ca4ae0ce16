use serde::{Deserialize, Serialize};

/// 速率限制窗口记录，每个客户端键一条
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RateWindow {
    pub key: String,
    pub count: u32,
    pub reset_at: i64, // Unix 毫秒时间戳
}

/// 单次检查的判定结果，构造后不再修改
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: i64,
}

impl RateLimitDecision {
    pub fn allow(remaining: u32, reset_at: i64) -> Self {
        Self {
            allowed: true,
            remaining,
            reset_at,
        }
    }

    pub fn deny(reset_at: i64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            reset_at,
        }
    }

    /// 距离窗口重置的秒数（向上取整）
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let wait_ms = (self.reset_at - now_ms).max(0) as u64;
        wait_ms.div_ceil(1000)
    }
}
