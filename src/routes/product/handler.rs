use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    middleware::AdminPrincipal,
    routes::extract::{AppJson, AppPath, AppQuery},
};

use super::model::{CreateProductRequest, Product, ProductFilter, UpdateProductRequest};

pub async fn list_products(
    State(state): State<AppState>,
    jar: CookieJar,
    AppQuery(filter): AppQuery<ProductFilter>,
) -> Result<Json<Vec<Product>>, AppError> {
    let admin = state.sessions.is_admin(&jar, &state.config.session_cookie_name).await;
    Ok(Json(Product::list(&state.pool, &filter.visible_to(admin)).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    jar: CookieJar,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Product>, AppError> {
    let admin = state.sessions.is_admin(&jar, &state.config.session_cookie_name).await;
    Product::find_by_id(&state.pool, id)
        .await?
        .filter(|product| product.is_visible_to(admin))
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminPrincipal>,
    AppJson(req): AppJson<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let slug = req.validate()?;
    let product = Product::create(&state.pool, req, slug).await?;
    tracing::debug!("Product {} created by {}", product.id, admin.0);
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    let slug = req.validate()?;
    Product::update(&state.pool, id, req, slug)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn delete_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !Product::delete(&state.pool, id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "success": true })))
}
