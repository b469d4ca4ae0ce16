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

use super::model::{CreatePageRequest, Page, PageFilter, UpdatePageRequest};

// 未登录的访客只能看到已发布的页面
pub async fn list_pages(
    State(state): State<AppState>,
    jar: CookieJar,
    AppQuery(filter): AppQuery<PageFilter>,
) -> Result<Json<Vec<Page>>, AppError> {
    let admin = state.sessions.is_admin(&jar, &state.config.session_cookie_name).await;
    Ok(Json(Page::list(&state.pool, &filter.visible_to(admin)).await?))
}

pub async fn get_page(
    State(state): State<AppState>,
    jar: CookieJar,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Page>, AppError> {
    let admin = state.sessions.is_admin(&jar, &state.config.session_cookie_name).await;
    Page::find_by_id(&state.pool, id)
        .await?
        .filter(|page| page.is_visible_to(admin))
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn get_page_by_slug(
    State(state): State<AppState>,
    jar: CookieJar,
    AppPath(slug): AppPath<String>,
) -> Result<Json<Page>, AppError> {
    let admin = state.sessions.is_admin(&jar, &state.config.session_cookie_name).await;
    Page::find_by_slug(&state.pool, &slug)
        .await?
        .filter(|page| page.is_visible_to(admin))
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn create_page(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminPrincipal>,
    AppJson(req): AppJson<CreatePageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let slug = req.validate()?;
    let page = Page::create(&state.pool, req, slug).await?;
    tracing::debug!("Page {} created by {}", page.id, admin.0);
    Ok((StatusCode::CREATED, Json(page)))
}

pub async fn update_page(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdatePageRequest>,
) -> Result<Json<Page>, AppError> {
    let slug = req.validate()?;
    Page::update(&state.pool, id, req, slug)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn delete_page(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !Page::delete(&state.pool, id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "success": true })))
}
