use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::utils::{require_non_empty, require_non_negative};

/// 首页轮播图
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Slide {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SlideFilter {
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSlideRequest {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateSlideRequest {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub position: Option<i32>,
    pub is_active: Option<bool>,
}

fn default_active() -> bool {
    true
}

impl CreateSlideRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_non_empty("title", &self.title)?;
        require_non_empty("image_url", &self.image_url)?;
        require_non_negative("position", self.position)
    }
}

impl UpdateSlideRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            require_non_empty("title", title)?;
        }
        if let Some(image_url) = &self.image_url {
            require_non_empty("image_url", image_url)?;
        }
        if let Some(position) = self.position {
            require_non_negative("position", position)?;
        }
        Ok(())
    }
}

impl SlideFilter {
    pub fn visible_to(self, admin: bool) -> Self {
        if admin { self } else { Self { active: Some(true) } }
    }
}

const SLIDE_COLUMNS: &str =
    "id, title, subtitle, image_url, link_url, position, is_active, created_at, updated_at";

impl Slide {
    pub fn is_visible_to(&self, admin: bool) -> bool {
        admin || self.is_active
    }

    /// 按 position 升序
    pub async fn list(pool: &PgPool, filter: &SlideFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Slide>(&format!(
            r#"
            SELECT {} FROM slides
            WHERE ($1::BOOLEAN IS NULL OR is_active = $1)
            ORDER BY position ASC, created_at ASC
            "#,
            SLIDE_COLUMNS
        ))
        .bind(filter.active)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Slide>(&format!("SELECT {} FROM slides WHERE id = $1", SLIDE_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &PgPool, req: CreateSlideRequest) -> Result<Self, sqlx::Error> {
        let slide = sqlx::query_as::<_, Slide>(&format!(
            r#"
            INSERT INTO slides (id, title, subtitle, image_url, link_url, position, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SLIDE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(req.title.trim())
        .bind(req.subtitle)
        .bind(req.image_url.trim())
        .bind(req.link_url)
        .bind(req.position)
        .bind(req.is_active)
        .fetch_one(pool)
        .await?;

        tracing::info!("Created slide {} at position {}", slide.id, slide.position);
        Ok(slide)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: UpdateSlideRequest,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Slide>(&format!(
            r#"
            UPDATE slides
            SET title = COALESCE($2, title),
                subtitle = COALESCE($3, subtitle),
                image_url = COALESCE($4, image_url),
                link_url = COALESCE($5, link_url),
                position = COALESCE($6, position),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SLIDE_COLUMNS
        ))
        .bind(id)
        .bind(req.title.as_deref().map(str::trim))
        .bind(req.subtitle)
        .bind(req.image_url.as_deref().map(str::trim))
        .bind(req.link_url)
        .bind(req.position)
        .bind(req.is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM slides WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
