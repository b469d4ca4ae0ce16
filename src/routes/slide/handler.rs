use axum::{
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
    routes::extract::{AppJson, AppPath, AppQuery},
};

use super::model::{CreateSlideRequest, Slide, SlideFilter, UpdateSlideRequest};

pub async fn list_slides(
    State(state): State<AppState>,
    jar: CookieJar,
    AppQuery(filter): AppQuery<SlideFilter>,
) -> Result<Json<Vec<Slide>>, AppError> {
    let admin = state.sessions.is_admin(&jar, &state.config.session_cookie_name).await;
    Ok(Json(Slide::list(&state.pool, &filter.visible_to(admin)).await?))
}

pub async fn get_slide(
    State(state): State<AppState>,
    jar: CookieJar,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Slide>, AppError> {
    let admin = state.sessions.is_admin(&jar, &state.config.session_cookie_name).await;
    Slide::find_by_id(&state.pool, id)
        .await?
        .filter(|slide| slide.is_visible_to(admin))
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn create_slide(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateSlideRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let slide = Slide::create(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(slide)))
}

pub async fn update_slide(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateSlideRequest>,
) -> Result<Json<Slide>, AppError> {
    req.validate()?;
    Slide::update(&state.pool, id, req)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn delete_slide(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !Slide::delete(&state.pool, id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "success": true })))
}
