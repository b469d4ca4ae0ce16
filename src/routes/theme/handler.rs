use axum::extract::{Json, State};

use crate::{AppState, error::AppError, routes::extract::AppJson};

use super::model::{ThemeSettings, UpdateThemeRequest};

pub async fn get_theme(State(state): State<AppState>) -> Result<Json<ThemeSettings>, AppError> {
    Ok(Json(ThemeSettings::get(&state.pool).await?))
}

pub async fn update_theme(
    State(state): State<AppState>,
    AppJson(req): AppJson<UpdateThemeRequest>,
) -> Result<Json<ThemeSettings>, AppError> {
    req.validate()?;
    Ok(Json(ThemeSettings::update(&state.pool, req).await?))
}
