use axum::{
    Extension,
    extract::{Json, State, rejection::JsonRejection},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{
    AppState,
    error::AppError,
    middleware::AdminPrincipal,
    utils::{expired_session_cookie, session_cookie, verify_password},
};

use super::model::{LoginRequest, LoginResponse, SessionResponse};

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    // 请求体不完整同样按登录失败处理
    let Json(req) = body.map_err(|rejection| {
        tracing::info!("Rejected malformed admin login: {}", rejection.body_text());
        AppError::Unauthorized
    })?;

    let username_matches = req.username == state.config.admin_username;
    let hash = state.config.admin_password_hash.clone();
    let password = req.password;

    // bcrypt 校验耗 CPU，放到阻塞线程池
    let password_matches = tokio::task::spawn_blocking(move || {
        verify_password(&password, &hash).unwrap_or(false)
    })
    .await
    .map_err(|e| {
        tracing::error!("Password verification task failed: {}", e);
        AppError::InternalServerError
    })?;

    if !(username_matches && password_matches) {
        tracing::info!("Rejected admin login for {}", req.username);
        return Err(AppError::Unauthorized);
    }

    let token = state
        .sessions
        .store()
        .create(&state.config.admin_username, state.config.session_ttl())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create admin session: {}", e);
            AppError::InternalServerError
        })?;

    tracing::info!("Admin {} logged in", state.config.admin_username);
    Ok((
        jar.add(session_cookie(&state.config, token)),
        Json(LoginResponse {
            principal: state.config.admin_username.clone(),
        }),
    ))
}

/// 登出总是成功：会话吊销失败只记录日志，Cookie 照常清除
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(&state.config.session_cookie_name) {
        let token = cookie.value();
        if !token.is_empty() {
            if let Err(e) = state.sessions.store().revoke(token).await {
                tracing::warn!("Failed to revoke admin session: {}", e);
            }
        }
    }

    (
        jar.remove(expired_session_cookie(&state.config)),
        Json(json!({ "success": true })),
    )
}

pub async fn current_session(Extension(admin): Extension<AdminPrincipal>) -> Json<SessionResponse> {
    Json(SessionResponse {
        authorized: true,
        principal: admin.0,
    })
}
