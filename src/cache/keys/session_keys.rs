use sha2::{Digest, Sha256};

/// 管理员会话缓存键前缀
const ADMIN_SESSION_PREFIX: &str = "admin_session:";

/// 令牌摘要（十六进制），存储层只见摘要
pub fn session_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// 生成会话缓存键
pub fn admin_session_key(token: &str) -> String {
    format!("{}{}", ADMIN_SESSION_PREFIX, session_digest(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_hides_token() {
        let key = admin_session_key("secret-token");
        assert!(key.starts_with(ADMIN_SESSION_PREFIX));
        assert!(!key.contains("secret-token"));
        assert_eq!(key.len(), ADMIN_SESSION_PREFIX.len() + 64);
        assert_eq!(key, admin_session_key("secret-token"));
    }
}
