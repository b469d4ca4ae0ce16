use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::cache::keys::{admin_session_key, session_digest};
use crate::cache::models::session::CachedSession;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// 受信任的会话存储
///
/// 令牌对调用方是不透明的；实现负责签发、校验与吊销。
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 为主体签发新会话，返回写入 Cookie 的令牌
    async fn create(&self, principal: &str, ttl: Duration) -> Result<String, SessionError>;

    /// 查找令牌对应的会话，过期或不存在时返回 None
    async fn lookup(&self, token: &str) -> Result<Option<CachedSession>, SessionError>;

    /// 吊销会话
    async fn revoke(&self, token: &str) -> Result<(), SessionError>;
}

/// 生成随机会话令牌
pub fn generate_session_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

fn new_session(token: &str, principal: &str, ttl: Duration) -> CachedSession {
    let now = chrono::Utc::now().timestamp();
    CachedSession {
        session_id: session_digest(token),
        principal: principal.to_string(),
        created_at: now,
        expires_at: now + ttl.as_secs() as i64,
    }
}

/// Redis 会话存储
pub struct RedisSessionStore {
    redis: Arc<RedisClient>,
}

impl RedisSessionStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, principal: &str, ttl: Duration) -> Result<String, SessionError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let token = generate_session_token();
        let session = new_session(&token, principal, ttl);
        let json = serde_json::to_string(&session)?;

        let _: () = conn
            .set_ex(admin_session_key(&token), json, ttl.as_secs().max(1))
            .await?;

        tracing::debug!("Cached admin session for {}", principal);
        Ok(token)
    }

    async fn lookup(&self, token: &str) -> Result<Option<CachedSession>, SessionError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let result: Option<String> = conn.get(admin_session_key(token)).await?;
        match result {
            Some(json) => {
                let session: CachedSession = serde_json::from_str(&json)?;
                if session.is_expired(chrono::Utc::now().timestamp()) {
                    Ok(None)
                } else {
                    Ok(Some(session))
                }
            }
            None => Ok(None),
        }
    }

    async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let _: () = conn.del(admin_session_key(token)).await?;
        Ok(())
    }
}

/// 进程内会话存储，用于开发与测试
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, CachedSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, principal: &str, ttl: Duration) -> Result<String, SessionError> {
        let token = generate_session_token();
        let session = new_session(&token, principal, ttl);
        self.sessions.insert(session.session_id.clone(), session);
        Ok(token)
    }

    async fn lookup(&self, token: &str) -> Result<Option<CachedSession>, SessionError> {
        let digest = session_digest(token);
        let now = chrono::Utc::now().timestamp();

        let session = self.sessions.get(&digest).map(|s| s.value().clone());
        match session {
            Some(session) if session.is_expired(now) => {
                self.sessions.remove(&digest);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        self.sessions.remove(&session_digest(token));
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
}

/// 无状态的签名令牌会话，吊销只能依靠过期
pub struct JwtSessionStore {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtSessionStore {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[async_trait]
impl SessionStore for JwtSessionStore {
    async fn create(&self, principal: &str, ttl: Duration) -> Result<String, SessionError> {
        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: principal.to_string(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    async fn lookup(&self, token: &str) -> Result<Option<CachedSession>, SessionError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(Some(CachedSession {
                session_id: session_digest(token),
                principal: data.claims.sub,
                created_at: data.claims.iat,
                expires_at: data.claims.exp,
            })),
            // 签名错误、过期、格式错误都视为会话不存在
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                Ok(None)
            }
        }
    }

    async fn revoke(&self, _token: &str) -> Result<(), SessionError> {
        tracing::debug!("Signed sessions cannot be revoked before expiry");
        Ok(())
    }
}
