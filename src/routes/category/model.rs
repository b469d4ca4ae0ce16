use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::utils::{require_non_empty, resolve_slug, slugify};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

impl CreateCategoryRequest {
    pub fn validate(&self) -> Result<String, AppError> {
        require_non_empty("name", &self.name)?;
        resolve_slug(self.slug.as_deref(), &self.name)
    }
}

impl UpdateCategoryRequest {
    pub fn validate(&self) -> Result<Option<String>, AppError> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        match self.slug.as_deref().map(slugify) {
            Some(slug) if slug.is_empty() => {
                Err(AppError::BadRequest("slug must not be empty".to_string()))
            }
            other => Ok(other),
        }
    }
}

const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";

impl Category {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories ORDER BY name ASC",
            CATEGORY_COLUMNS
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE id = $1",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        req: CreateCategoryRequest,
        slug: String,
    ) -> Result<Self, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (id, name, slug, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(req.name.trim())
        .bind(slug)
        .bind(req.description)
        .fetch_one(pool)
        .await?;

        tracing::info!("Created category {} ({})", category.slug, category.id);
        Ok(category)
    }

    /// 部分更新，未提供的字段保持不变
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: UpdateCategoryRequest,
        slug: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(slug)
        .bind(req.description)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
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
    fn test_create_derives_slug_from_name() {
        let req = CreateCategoryRequest {
            name: "Home & Garden".to_string(),
            slug: None,
            description: None,
        };
        assert_eq!(req.validate().unwrap(), "home-garden");
    }

    #[test]
    fn test_update_rejects_blank_fields() {
        let req = UpdateCategoryRequest {
            name: Some(" ".to_string()),
            slug: None,
            description: None,
        };
        assert!(req.validate().is_err());

        let req = UpdateCategoryRequest {
            name: None,
            slug: Some("***".to_string()),
            description: None,
        };
        assert!(req.validate().is_err());

        let req = UpdateCategoryRequest {
            name: None,
            slug: None,
            description: Some("new".to_string()),
        };
        assert_eq!(req.validate().unwrap(), None);
    }
}
