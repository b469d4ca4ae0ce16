use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;
use crate::utils::{is_hex_color, require_non_empty};

/// 主题设置只有一行，id 固定为 1
const THEME_ROW_ID: i32 = 1;

#[derive(Debug, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ThemeSettings {
    pub primary_color: String,
    pub secondary_color: String,
    pub font_family: String,
    pub logo_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            primary_color: "#111827".to_string(),
            secondary_color: "#f59e0b".to_string(),
            font_family: "Inter, sans-serif".to_string(),
            logo_url: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateThemeRequest {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub font_family: Option<String>,
    pub logo_url: Option<String>,
}

impl UpdateThemeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("primary_color", &self.primary_color),
            ("secondary_color", &self.secondary_color),
        ] {
            if let Some(color) = value {
                if !is_hex_color(color) {
                    return Err(AppError::BadRequest(format!(
                        "{} must be a #rrggbb color",
                        field
                    )));
                }
            }
        }
        if let Some(font) = &self.font_family {
            require_non_empty("font_family", font)?;
        }
        Ok(())
    }
}

impl ThemeSettings {
    /// 尚未保存过设置时返回默认主题
    pub async fn get(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let settings = sqlx::query_as::<_, ThemeSettings>(
            r#"
            SELECT primary_color, secondary_color, font_family, logo_url, updated_at
            FROM theme_settings
            WHERE id = $1
            "#,
        )
        .bind(THEME_ROW_ID)
        .fetch_optional(pool)
        .await?;

        Ok(settings.unwrap_or_default())
    }

    /// 合并在同一条语句内完成，并发的部分更新不会互相覆盖
    pub async fn update(pool: &PgPool, req: UpdateThemeRequest) -> Result<Self, sqlx::Error> {
        let defaults = ThemeSettings::default();
        let saved = sqlx::query_as::<_, ThemeSettings>(UPSERT_THEME_SQL)
            .bind(THEME_ROW_ID)
            .bind(req.primary_color)
            .bind(req.secondary_color)
            .bind(req.font_family.as_deref().map(str::trim))
            .bind(req.logo_url)
            .bind(defaults.primary_color)
            .bind(defaults.secondary_color)
            .bind(defaults.font_family)
            .fetch_one(pool)
            .await?;

        tracing::info!("Theme settings updated");
        Ok(saved)
    }
}

// $2..$5 为本次修改（可为空），$6..$8 为首次写入时的默认值
const UPSERT_THEME_SQL: &str = r#"
    INSERT INTO theme_settings (id, primary_color, secondary_color, font_family, logo_url)
    VALUES ($1, COALESCE($2, $6), COALESCE($3, $7), COALESCE($4, $8), $5)
    ON CONFLICT (id) DO UPDATE
    SET primary_color = COALESCE($2, theme_settings.primary_color),
        secondary_color = COALESCE($3, theme_settings.secondary_color),
        font_family = COALESCE($4, theme_settings.font_family),
        logo_url = COALESCE($5, theme_settings.logo_url),
        updated_at = NOW()
    RETURNING primary_color, secondary_color, font_family, logo_url, updated_at
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_colors() {
        let req = UpdateThemeRequest {
            primary_color: Some("red".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let req = UpdateThemeRequest {
            secondary_color: Some("#00ff00".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_upsert_merges_against_stored_row() {
        for column in ["primary_color", "secondary_color", "font_family", "logo_url"] {
            let merge = format!("{column} = COALESCE(");
            let clause = UPSERT_THEME_SQL
                .split(&merge)
                .nth(1)
                .and_then(|rest| rest.split(')').next())
                .unwrap();
            assert!(
                clause.ends_with(&format!("theme_settings.{column}")),
                "{column} must fall back to the stored value, got {clause}"
            );
        }
        assert!(!UPSERT_THEME_SQL.contains("EXCLUDED"));
    }
}
