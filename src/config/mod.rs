use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::cache::operations::rate_limit::CounterMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// 会话存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Redis,
    Memory,
    Jwt,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub run_migrations: bool,
    pub rate_limit_window_ms: u64,
    pub rate_limit_requests: u32,
    pub login_rate_limit_window_ms: u64,
    pub login_rate_limit_requests: u32,
    pub rate_limit_strict: bool,
    pub rate_limit_max_keys: Option<usize>,
    pub rate_limit_sweep_secs: Option<u64>,
    pub session_backend: SessionBackend,
    pub session_cookie_name: String,
    pub session_ttl_secs: u64,
    pub session_cookie_secure: bool,
    pub jwt_secret: Option<String>,
    pub admin_username: String,
    pub admin_password_hash: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 从任意键值来源构建配置，便于测试
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let session_backend = match get("SESSION_BACKEND") {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "redis" => SessionBackend::Redis,
                "memory" => SessionBackend::Memory,
                "jwt" => SessionBackend::Jwt,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "SESSION_BACKEND",
                        value,
                    });
                }
            },
            None => SessionBackend::Redis,
        };

        // SESSION_TTL 以小时计，允许 "24h" 的写法
        let session_ttl_hours = parse_or(&get, "SESSION_TTL", 24u64, |v| {
            v.trim_end_matches('h').parse().ok()
        })?;

        let config = Config {
            database_url: required("DATABASE_URL")?,
            redis_url: get("REDIS_URL"),
            server_host: get("SERVER_HOST").unwrap_or_else(|| "::".to_string()),
            server_port: parse_or(&get, "SERVER_PORT", 3000, |v| v.parse().ok())?,
            api_base_uri: get("API_BASE_URI").unwrap_or_else(|| "/api".to_string()),
            run_migrations: parse_or(&get, "RUN_MIGRATIONS", true, parse_bool)?,
            rate_limit_window_ms: parse_or(&get, "RATE_LIMIT_WINDOW_MS", 60_000, parse_window_ms)?,
            rate_limit_requests: parse_or(&get, "RATE_LIMIT_REQUESTS", 100, parse_positive)?,
            login_rate_limit_window_ms: parse_or(
                &get,
                "LOGIN_RATE_LIMIT_WINDOW_MS",
                900_000,
                parse_window_ms,
            )?,
            login_rate_limit_requests: parse_or(&get, "LOGIN_RATE_LIMIT_REQUESTS", 5, parse_positive)?,
            rate_limit_strict: parse_or(&get, "RATE_LIMIT_STRICT", false, parse_bool)?,
            rate_limit_max_keys: parse_optional(&get, "RATE_LIMIT_MAX_KEYS", parse_positive)?,
            rate_limit_sweep_secs: parse_optional(&get, "RATE_LIMIT_SWEEP_SECS", parse_positive)?,
            session_backend,
            session_cookie_name: get("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| "admin_session".to_string()),
            session_ttl_secs: session_ttl_hours * 3600,
            session_cookie_secure: parse_or(&get, "SESSION_COOKIE_SECURE", false, parse_bool)?,
            jwt_secret: get("JWT_SECRET"),
            admin_username: get("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            admin_password_hash: required("ADMIN_PASSWORD_HASH")?,
        };

        match config.session_backend {
            SessionBackend::Redis if config.redis_url.is_none() => {
                Err(ConfigError::Missing("REDIS_URL"))
            }
            SessionBackend::Jwt if config.jwt_secret.is_none() => {
                Err(ConfigError::Missing("JWT_SECRET"))
            }
            _ => Ok(config),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn counter_mode(&self) -> CounterMode {
        if self.rate_limit_strict {
            CounterMode::Strict
        } else {
            CounterMode::Relaxed
        }
    }
}

fn parse_or<G, T, P>(get: &G, name: &'static str, default: T, parse: P) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    Ok(parse_optional(get, name, parse)?.unwrap_or(default))
}

fn parse_optional<G, T, P>(get: &G, name: &'static str, parse: P) -> Result<Option<T>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    match get(name) {
        Some(value) => parse(value.trim())
            .map(Some)
            .ok_or(ConfigError::Invalid { name, value }),
        None => Ok(None),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_positive<T>(value: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    value.parse::<T>().ok().filter(|v| *v > T::default())
}

/// 窗口长度需要能加到毫秒时间戳（i64）上
fn parse_window_ms(value: &str) -> Option<u64> {
    parse_positive::<u64>(value).filter(|ms| i64::try_from(*ms).is_ok())
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/storefront_test".to_string(),
        redis_url: None,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        api_base_uri: "/api".to_string(),
        run_migrations: false,
        rate_limit_window_ms: 60_000,
        rate_limit_requests: 100,
        login_rate_limit_window_ms: 900_000,
        login_rate_limit_requests: 5,
        rate_limit_strict: false,
        rate_limit_max_keys: None,
        rate_limit_sweep_secs: None,
        session_backend: SessionBackend::Memory,
        session_cookie_name: "admin_session".to_string(),
        session_ttl_secs: 3600,
        session_cookie_secure: false,
        jwt_secret: None,
        admin_username: "admin".to_string(),
        admin_password_hash: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_with_memory_backend() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("ADMIN_PASSWORD_HASH", "$2b$04$hash"),
            ("SESSION_BACKEND", "memory"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_uri, "/api");
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.rate_limit_window_ms, 60_000);
        assert_eq!(config.rate_limit_requests, 100);
        assert_eq!(config.login_rate_limit_requests, 5);
        assert_eq!(config.session_ttl_secs, 24 * 3600);
        assert_eq!(config.counter_mode(), CounterMode::Relaxed);
        assert!(config.rate_limit_max_keys.is_none());
        assert_eq!(config.admin_username, "admin");
    }

    #[test]
    fn test_session_ttl_accepts_hour_suffix() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("ADMIN_PASSWORD_HASH", "x"),
            ("SESSION_BACKEND", "memory"),
            ("SESSION_TTL", "2h"),
            ("RATE_LIMIT_STRICT", "true"),
        ]))
        .unwrap();

        assert_eq!(config.session_ttl().as_secs(), 7200);
        assert_eq!(config.counter_mode(), CounterMode::Strict);
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_lookup(lookup(&[("ADMIN_PASSWORD_HASH", "x")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("ADMIN_PASSWORD_HASH", "x"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("REDIS_URL")));
    }

    #[test]
    fn test_rejects_zero_window_and_unknown_backend() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("ADMIN_PASSWORD_HASH", "x"),
            ("SESSION_BACKEND", "memory"),
            ("RATE_LIMIT_WINDOW_MS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "RATE_LIMIT_WINDOW_MS",
                ..
            }
        ));

        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("ADMIN_PASSWORD_HASH", "x"),
            ("SESSION_BACKEND", "cookie"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SESSION_BACKEND", .. }));
    }

    #[test]
    fn test_rejects_window_beyond_timestamp_range() {
        let base = [
            ("DATABASE_URL", "postgres://db"),
            ("ADMIN_PASSWORD_HASH", "x"),
            ("SESSION_BACKEND", "memory"),
        ];
        let too_long = u64::MAX.to_string();
        let max_ok = i64::MAX.to_string();

        for name in ["RATE_LIMIT_WINDOW_MS", "LOGIN_RATE_LIMIT_WINDOW_MS"] {
            let mut pairs: Vec<(&str, &str)> = base.to_vec();
            pairs.push((name, too_long.as_str()));
            let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { name: n, .. } if n == name));
        }

        let mut pairs: Vec<(&str, &str)> = base.to_vec();
        pairs.push(("RATE_LIMIT_WINDOW_MS", max_ok.as_str()));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.rate_limit_window_ms, i64::MAX as u64);
    }
}
