use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    middleware::AdminPrincipal,
    routes::extract::{AppJson, AppPath},
};

use super::model::{Category, CreateCategoryRequest, UpdateCategoryRequest};

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(Category::list(&state.pool).await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Category>, AppError> {
    Category::find_by_id(&state.pool, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminPrincipal>,
    AppJson(req): AppJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let slug = req.validate()?;
    let category = Category::create(&state.pool, req, slug).await?;
    tracing::debug!("Category {} created by {}", category.id, admin.0);
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let slug = req.validate()?;
    Category::update(&state.pool, id, req, slug)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn delete_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !Category::delete(&state.pool, id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "success": true })))
}
