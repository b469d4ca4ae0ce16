use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::utils::{require_non_empty, resolve_slug, slugify};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Page {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PageFilter {
    pub published: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePageRequest {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdatePageRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub is_published: Option<bool>,
}

impl CreatePageRequest {
    pub fn validate(&self) -> Result<String, AppError> {
        require_non_empty("title", &self.title)?;
        resolve_slug(self.slug.as_deref(), &self.title)
    }
}

impl UpdatePageRequest {
    pub fn validate(&self) -> Result<Option<String>, AppError> {
        if let Some(title) = &self.title {
            require_non_empty("title", title)?;
        }
        match self.slug.as_deref().map(slugify) {
            Some(slug) if slug.is_empty() => {
                Err(AppError::BadRequest("slug must not be empty".to_string()))
            }
            other => Ok(other),
        }
    }
}

impl PageFilter {
    /// 非管理员强制只看已发布页面
    pub fn visible_to(self, admin: bool) -> Self {
        if admin {
            self
        } else {
            Self {
                published: Some(true),
            }
        }
    }
}

const PAGE_COLUMNS: &str = "id, title, slug, content, is_published, created_at, updated_at";

impl Page {
    pub fn is_visible_to(&self, admin: bool) -> bool {
        admin || self.is_published
    }

    pub async fn list(pool: &PgPool, filter: &PageFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Page>(&format!(
            r#"
            SELECT {} FROM pages
            WHERE ($1::BOOLEAN IS NULL OR is_published = $1)
            ORDER BY title ASC
            "#,
            PAGE_COLUMNS
        ))
        .bind(filter.published)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Page>(&format!("SELECT {} FROM pages WHERE id = $1", PAGE_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Page>(&format!("SELECT {} FROM pages WHERE slug = $1", PAGE_COLUMNS))
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &PgPool, req: CreatePageRequest, slug: String) -> Result<Self, sqlx::Error> {
        let page = sqlx::query_as::<_, Page>(&format!(
            r#"
            INSERT INTO pages (id, title, slug, content, is_published)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PAGE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(req.title.trim())
        .bind(slug)
        .bind(req.content)
        .bind(req.is_published)
        .fetch_one(pool)
        .await?;

        tracing::info!("Created page {} ({})", page.slug, page.id);
        Ok(page)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: UpdatePageRequest,
        slug: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Page>(&format!(
            r#"
            UPDATE pages
            SET title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                content = COALESCE($4, content),
                is_published = COALESCE($5, is_published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PAGE_COLUMNS
        ))
        .bind(id)
        .bind(req.title.as_deref().map(str::trim))
        .bind(slug)
        .bind(req.content)
        .bind(req.is_published)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_to_draft() {
        let req: CreatePageRequest =
            serde_json::from_value(serde_json::json!({ "title": "About Us" })).unwrap();
        assert!(!req.is_published);
        assert_eq!(req.content, "");
        assert_eq!(req.validate().unwrap(), "about-us");
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let req = UpdatePageRequest {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_anonymous_viewers_only_see_published() {
        let drafts = PageFilter {
            published: Some(false),
        };
        assert_eq!(drafts.visible_to(false).published, Some(true));
        assert_eq!(PageFilter::default().visible_to(false).published, Some(true));
        assert_eq!(PageFilter::default().visible_to(true).published, None);

        let page: Page = serde_json::from_value(serde_json::json!({
            "id": "6f1c1d1e-8d4f-4b7a-9a55-0d0f4a0c2b11",
            "title": "Draft",
            "slug": "draft",
            "content": "",
            "is_published": false,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(!page.is_visible_to(false));
        assert!(page.is_visible_to(true));
    }
}
