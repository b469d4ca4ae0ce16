use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    cache::{RateLimitDecision, SlidingWindowCounter},
    error::{AppError, rate_limit_headers},
};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// 限流参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOptions {
    pub window_ms: u64,
    pub max: u32,
}

/// 从请求头推导客户端标识
///
/// 优先使用 X-Forwarded-For 的第一项，否则退回到 User-Agent。
/// 调用方可以任意伪造这两个请求头，生产环境需要在受信任的代理上
/// 覆盖 X-Forwarded-For。
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return format!("ip:{}", ip);
    }

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .filter(|ua| !ua.is_empty())
        .unwrap_or("unknown");

    format!("ua:{}", user_agent)
}

/// 限流闸门：客户端标识 + 计数器
#[derive(Clone)]
pub struct RateLimitGate {
    counter: Arc<SlidingWindowCounter>,
    options: RateLimitOptions,
}

impl RateLimitGate {
    pub fn new(counter: Arc<SlidingWindowCounter>, options: RateLimitOptions) -> Self {
        Self { counter, options }
    }

    pub fn options(&self) -> RateLimitOptions {
        self.options
    }

    pub fn counter(&self) -> &Arc<SlidingWindowCounter> {
        &self.counter
    }

    pub fn admit(&self, headers: &HeaderMap, options: RateLimitOptions) -> RateLimitDecision {
        let key = client_key(headers);
        let decision = self.counter.check(&key, options.window_ms, options.max);
        if !decision.allowed {
            tracing::debug!("Rate limit exceeded for {}", key);
        }
        decision
    }

    /// 使用闸门自身的默认参数
    pub fn admit_default(&self, headers: &HeaderMap) -> RateLimitDecision {
        self.admit(headers, self.options)
    }
}

pub async fn rate_limit(
    State(gate): State<RateLimitGate>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let limit = gate.options().max;
    let decision = gate.admit_default(req.headers());

    if !decision.allowed {
        return AppError::RateLimited { limit, decision }.into_response();
    }

    let mut response = next.run(req).await;
    // 内层更严格的限流已写入的头保持不变
    let headers = response.headers_mut();
    for (name, value) in rate_limit_headers(limit, &decision) {
        if let Some(name) = name {
            headers.entry(name).or_insert(value);
        }
    }
    response
}
