use axum_extra::extract::cookie::{Cookie, SameSite};
use bcrypt::{DEFAULT_COST, hash, verify};

use crate::config::Config;
use crate::error::AppError;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// 会话 Cookie
pub fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((config.session_cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.session_cookie_secure)
        .build()
}

/// 用于清除会话 Cookie，路径必须与签发时一致
pub fn expired_session_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((config.session_cookie_name.clone(), ""))
        .path("/")
        .build()
}

/// 由名称生成 URL 片段：小写字母数字，其余字符折叠为单个 '-'
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// 取显式 slug，否则由名称生成
pub fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String, AppError> {
    let slug = match explicit {
        Some(s) => slugify(s),
        None => slugify(name),
    };
    if slug.is_empty() {
        return Err(AppError::BadRequest("slug must not be empty".to_string()));
    }
    Ok(slug)
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

pub fn require_non_negative<T: PartialOrd + Default>(field: &str, value: T) -> Result<(), AppError> {
    if value < T::default() {
        return Err(AppError::BadRequest(format!("{} must not be negative", field)));
    }
    Ok(())
}

/// #rrggbb 格式颜色
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Summer Sale 2024!"), "summer-sale-2024");
        assert_eq!(slugify("  --Hello,   World--  "), "hello-world");
        assert_eq!(slugify("Café Crème"), "café-crème");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_resolve_slug() {
        assert_eq!(resolve_slug(None, "Red Shoes").unwrap(), "red-shoes");
        assert_eq!(resolve_slug(Some("Custom Slug"), "ignored").unwrap(), "custom-slug");
        assert!(resolve_slug(None, "???").is_err());
    }

    #[test]
    fn test_validators() {
        assert!(require_non_empty("name", "x").is_ok());
        assert!(require_non_empty("name", "   ").is_err());
        assert!(require_non_negative("price", 0.0).is_ok());
        assert!(require_non_negative("price", -0.5).is_err());
        assert!(require_non_negative("stock", -1i32).is_err());
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#1a2B3c"));
        assert!(!is_hex_color("1a2b3c"));
        assert!(!is_hex_color("#1a2b3"));
        assert!(!is_hex_color("#gggggg"));
        assert!(!is_hex_color("#ééé"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let config = test_config();
        let cookie = session_cookie(&config, "token".to_string());
        assert_eq!(cookie.name(), "admin_session");
        assert_eq!(cookie.value(), "token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_password_roundtrip() {
        let hashed = hash("hunter2", 4).unwrap();
        assert!(verify_password("hunter2", &hashed).unwrap());
        assert!(!verify_password("hunter3", &hashed).unwrap());
    }
}
