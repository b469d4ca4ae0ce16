use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppError;
use crate::utils::{require_non_empty, require_non_negative, resolve_slug, slugify};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

fn default_active() -> bool {
    true
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<String, AppError> {
        require_non_empty("name", &self.name)?;
        if !self.price.is_finite() {
            return Err(AppError::BadRequest("price must be a number".to_string()));
        }
        require_non_negative("price", self.price)?;
        require_non_negative("stock", self.stock)?;
        resolve_slug(self.slug.as_deref(), &self.name)
    }
}

impl UpdateProductRequest {
    pub fn validate(&self) -> Result<Option<String>, AppError> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(price) = self.price {
            if !price.is_finite() {
                return Err(AppError::BadRequest("price must be a number".to_string()));
            }
            require_non_negative("price", price)?;
        }
        if let Some(stock) = self.stock {
            require_non_negative("stock", stock)?;
        }
        match self.slug.as_deref().map(slugify) {
            Some(slug) if slug.is_empty() => {
                Err(AppError::BadRequest("slug must not be empty".to_string()))
            }
            other => Ok(other),
        }
    }
}

impl ProductFilter {
    /// 非管理员只能看到上架商品
    pub fn visible_to(self, admin: bool) -> Self {
        if admin {
            self
        } else {
            Self {
                active: Some(true),
                ..self
            }
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, slug, description, price, stock, image_url, \
     category_id, is_active, created_at, updated_at";

impl Product {
    pub fn is_visible_to(&self, admin: bool) -> bool {
        admin || self.is_active
    }

    pub async fn list(pool: &PgPool, filter: &ProductFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM products WHERE TRUE", PRODUCT_COLUMNS));

        if let Some(category_id) = filter.category_id {
            query.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(active) = filter.active {
            query.push(" AND is_active = ").push_bind(active);
        }
        query.push(" ORDER BY created_at DESC");

        query.build_query_as::<Product>().fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        req: CreateProductRequest,
        slug: String,
    ) -> Result<Self, sqlx::Error> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products
                (id, name, slug, description, price, stock, image_url, category_id, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(req.name.trim())
        .bind(slug)
        .bind(req.description)
        .bind(req.price)
        .bind(req.stock)
        .bind(req.image_url)
        .bind(req.category_id)
        .bind(req.is_active)
        .fetch_one(pool)
        .await?;

        tracing::info!("Created product {} ({})", product.slug, product.id);
        Ok(product)
    }

    /// 部分更新，未提供的字段保持不变
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: UpdateProductRequest,
        slug: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                stock = COALESCE($6, stock),
                image_url = COALESCE($7, image_url),
                category_id = COALESCE($8, category_id),
                is_active = COALESCE($9, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(slug)
        .bind(req.description)
        .bind(req.price)
        .bind(req.stock)
        .bind(req.image_url)
        .bind(req.category_id)
        .bind(req.is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
