use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::cache::models::rate_limit::{RateLimitDecision, RateWindow};

/// 计数器并发模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterMode {
    /// 先读后写，两次独立加锁。同一键的并发请求可能同时通过上限
    #[default]
    Relaxed,
    /// 在同一个条目锁内完成读-改-写，并发下也不会超过上限
    Strict,
}

/// 按键计数的固定窗口限流器
///
/// 窗口到期后整体重置，而不是连续衰减。默认不做过期清理，
/// 不活跃键的记录会一直保留到该键再次出现；需要限制内存时
/// 使用 [`SlidingWindowCounter::with_max_keys`] 或定期调用
/// [`SlidingWindowCounter::sweep_expired`]。
#[derive(Debug, Default)]
pub struct SlidingWindowCounter {
    windows: DashMap<String, RateWindow>,
    mode: CounterMode,
    max_keys: Option<usize>,
}

impl SlidingWindowCounter {
    pub fn new(mode: CounterMode) -> Self {
        Self {
            windows: DashMap::new(),
            mode,
            max_keys: None,
        }
    }

    /// 限制保留的键数量，达到上限时先清理过期窗口，再成批淘汰最早到期的窗口
    pub fn with_max_keys(mut self, max_keys: Option<usize>) -> Self {
        self.max_keys = max_keys.filter(|n| *n > 0);
        self
    }

    pub fn mode(&self) -> CounterMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<RateWindow> {
        self.windows.get(key).map(|w| w.value().clone())
    }

    /// 使用当前时间检查并计数
    pub fn check(&self, key: &str, window_ms: u64, max: u32) -> RateLimitDecision {
        self.check_at(key, window_ms, max, now_millis())
    }

    /// 以给定时刻（毫秒）检查并计数
    pub fn check_at(&self, key: &str, window_ms: u64, max: u32, now: i64) -> RateLimitDecision {
        if !self.windows.contains_key(key) {
            self.make_room(now);
        }

        match self.mode {
            CounterMode::Strict => match self.windows.entry(key.to_owned()) {
                Entry::Occupied(mut entry) => advance(entry.get_mut(), window_ms, max, now),
                Entry::Vacant(entry) => {
                    let mut window = empty_window(key, now);
                    let decision = advance(&mut window, window_ms, max, now);
                    entry.insert(window);
                    decision
                }
            },
            CounterMode::Relaxed => {
                // 读取快照后释放锁，再写回
                let mut window = self
                    .windows
                    .get(key)
                    .map(|w| w.value().clone())
                    .unwrap_or_else(|| empty_window(key, now));
                let decision = advance(&mut window, window_ms, max, now);
                if decision.allowed {
                    self.windows.insert(key.to_owned(), window);
                }
                decision
            }
        }
    }

    /// 删除所有已到期的窗口，返回删除数量
    pub fn sweep_expired(&self, now: i64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| window.reset_at > now);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!("Swept {} expired rate limit windows", removed);
        }
        removed
    }

    /// 达到上限时先清理过期窗口，仍然满的话一次淘汰约十分之一最早到期的窗口
    ///
    /// 每次淘汰都要遍历全部窗口（O(n)），按批淘汰后接下来的 n/10 个新键
    /// 不再触发遍历，伪造键的洪水下平摊到每个请求的开销是常数级。
    fn make_room(&self, now: i64) {
        let Some(max_keys) = self.max_keys else {
            return;
        };
        if self.windows.len() < max_keys {
            return;
        }

        self.sweep_expired(now);
        let len = self.windows.len();
        if len < max_keys {
            return;
        }

        let batch = eviction_batch(max_keys).max(len + 1 - max_keys);
        let mut oldest: Vec<(i64, String)> = self
            .windows
            .iter()
            .map(|entry| (entry.value().reset_at, entry.key().clone()))
            .collect();
        if batch < oldest.len() {
            oldest.select_nth_unstable(batch);
            oldest.truncate(batch);
        }

        tracing::debug!("Evicting {} rate limit windows", oldest.len());
        for (_, key) in oldest {
            self.windows.remove(&key);
        }
    }
}

fn eviction_batch(max_keys: usize) -> usize {
    (max_keys / 10).max(1)
}

fn empty_window(key: &str, now: i64) -> RateWindow {
    RateWindow {
        key: key.to_owned(),
        count: 0,
        reset_at: now,
    }
}

/// 推进一个窗口的状态，拒绝时不修改
fn advance(window: &mut RateWindow, window_ms: u64, max: u32, now: i64) -> RateLimitDecision {
    if window.reset_at <= now {
        window.count = 1;
        let window_ms = i64::try_from(window_ms).unwrap_or(i64::MAX);
        window.reset_at = now.saturating_add(window_ms);
        return RateLimitDecision::allow(max.saturating_sub(1), window.reset_at);
    }

    if window.count < max {
        window.count += 1;
        return RateLimitDecision::allow(max - window.count, window.reset_at);
    }

    RateLimitDecision::deny(window.reset_at)
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
