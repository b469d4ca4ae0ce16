use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{AppState, cache::SessionStore, error::AppError};

/// 会话校验结果，未授权时不区分具体原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionVerdict {
    Authorized { principal: String },
    Unauthorized,
}

impl SessionVerdict {
    pub fn is_authorized(&self) -> bool {
        matches!(self, SessionVerdict::Authorized { .. })
    }
}

/// 已通过校验的管理员，由中间件放入请求扩展
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrincipal(pub String);

#[derive(Clone)]
pub struct AdminSessionCheck {
    store: Arc<dyn SessionStore>,
}

impl AdminSessionCheck {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// 每个请求只校验一次，失败不重试
    pub async fn verify(&self, credential: Option<&str>) -> SessionVerdict {
        let Some(token) = credential.map(str::trim).filter(|t| !t.is_empty()) else {
            return SessionVerdict::Unauthorized;
        };

        match self.store.lookup(token).await {
            Ok(Some(session)) if !session.principal.is_empty() => SessionVerdict::Authorized {
                principal: session.principal,
            },
            Ok(_) => SessionVerdict::Unauthorized,
            Err(e) => {
                tracing::warn!("Session store lookup failed: {}", e);
                SessionVerdict::Unauthorized
            }
        }
    }

    /// 公开接口用来判断是否展示草稿和下架内容
    pub async fn is_admin(&self, jar: &CookieJar, cookie_name: &str) -> bool {
        let credential = jar.get(cookie_name).map(|cookie| cookie.value().to_owned());
        self.verify(credential.as_deref()).await.is_authorized()
    }
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let credential = jar
        .get(&state.config.session_cookie_name)
        .map(|cookie| cookie.value().to_owned());

    match state.sessions.verify(credential.as_deref()).await {
        SessionVerdict::Authorized { principal } => {
            req.extensions_mut().insert(AdminPrincipal(principal));
            next.run(req).await
        }
        SessionVerdict::Unauthorized => AppError::Unauthorized.into_response(),
    }
}
