use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    middleware::{log_errors, rate_limit, require_admin},
    routes,
};

// 公开路由：只读接口和登录/登出
fn public_routes(state: &AppState) -> Router<AppState> {
    let login = Router::new()
        .route("/auth/login", post(routes::auth::login))
        .route_layer(axum::middleware::from_fn_with_state(
            state.login_limiter.clone(),
            rate_limit,
        ));

    Router::new()
        .route("/health", get(routes::health))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/products", get(routes::product::list_products))
        .route("/products/{id}", get(routes::product::get_product))
        .route("/categories", get(routes::category::list_categories))
        .route("/categories/{id}", get(routes::category::get_category))
        .route("/pages", get(routes::page::list_pages))
        .route("/pages/{id}", get(routes::page::get_page))
        .route("/pages/by-slug/{slug}", get(routes::page::get_page_by_slug))
        .route("/slides", get(routes::slide::list_slides))
        .route("/slides/{id}", get(routes::slide::get_slide))
        .route("/theme", get(routes::theme::get_theme))
        .merge(login)
}

// 管理员路由：所有写操作
fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/session", get(routes::auth::current_session))
        .route("/products", post(routes::product::create_product))
        .route(
            "/products/{id}",
            axum::routing::put(routes::product::update_product)
                .delete(routes::product::delete_product),
        )
        .route("/categories", post(routes::category::create_category))
        .route(
            "/categories/{id}",
            axum::routing::put(routes::category::update_category)
                .delete(routes::category::delete_category),
        )
        .route("/pages", post(routes::page::create_page))
        .route(
            "/pages/{id}",
            axum::routing::put(routes::page::update_page).delete(routes::page::delete_page),
        )
        .route("/slides", post(routes::slide::create_slide))
        .route(
            "/slides/{id}",
            axum::routing::put(routes::slide::update_slide).delete(routes::slide::delete_slide),
        )
        .route("/theme", axum::routing::put(routes::theme::update_theme))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ))
}

/// 组装完整路由，限流在最外层，先于认证执行
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(public_routes(&state))
        .merge(admin_routes(&state));

    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    let router = router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(axum::middleware::from_fn(log_errors))
            .layer(axum::middleware::from_fn_with_state(
                state.api_limiter.clone(),
                rate_limit,
            )),
    );

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::{CounterMode, SlidingWindowCounter, operations::MemorySessionStore},
        config::test_config,
        error::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING},
        middleware::{AdminSessionCheck, RateLimitGate, RateLimitOptions},
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn gate(max: u32) -> RateLimitGate {
        RateLimitGate::new(
            Arc::new(SlidingWindowCounter::new(CounterMode::Strict)),
            RateLimitOptions {
                window_ms: 60_000,
                max,
            },
        )
    }

    // 连接池惰性建立，测试路径都不会真正访问数据库
    fn test_state(api_max: u32, login_max: u32) -> AppState {
        let mut config = test_config();
        config.admin_password_hash = bcrypt::hash("correct horse", 4).unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();

        AppState {
            pool,
            config,
            sessions: AdminSessionCheck::new(Arc::new(MemorySessionStore::new())),
            api_limiter: gate(api_max),
            login_limiter: gate(login_max),
        }
    }

    fn request(method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.7")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &Router, password: &str) -> axum::response::Response {
        app.clone()
            .oneshot(
                request("POST", "/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({ "username": "admin", "password": password })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    fn session_cookie_pair(response: &axum::response::Response) -> String {
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_carries_rate_limit_headers() {
        let app = create_router(test_state(10, 5));
        let response = app
            .oneshot(request("GET", "/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_RATELIMIT_LIMIT], "10");
        assert_eq!(response.headers()[X_RATELIMIT_REMAINING], "9");
    }

    #[tokio::test]
    async fn test_requests_over_limit_get_429() {
        let app = create_router(test_state(2, 5));
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(request("GET", "/api/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(request("GET", "/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Too many requests" })
        );

        // 不同客户端有独立的窗口
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("x-forwarded-for", "198.51.100.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_mutations_require_session() {
        let app = create_router(test_state(100, 5));
        let cases = [
            ("POST", "/api/products"),
            ("PUT", "/api/products/6f1c1d1e-8d4f-4b7a-9a55-0d0f4a0c2b11"),
            ("DELETE", "/api/categories/6f1c1d1e-8d4f-4b7a-9a55-0d0f4a0c2b11"),
            ("POST", "/api/pages"),
            ("DELETE", "/api/slides/6f1c1d1e-8d4f-4b7a-9a55-0d0f4a0c2b11"),
            ("PUT", "/api/theme"),
            ("GET", "/api/auth/session"),
        ];

        for (method, uri) in cases {
            let response = app
                .clone()
                .oneshot(
                    request(method, uri)
                        .header(header::CONTENT_TYPE, "application/json")
                        .header(header::COOKIE, "admin_session=forged")
                        .body(Body::from("{}"))
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
            assert_eq!(
                body_json(response).await,
                serde_json::json!({ "error": "Unauthorized" })
            );
        }
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_rejected() {
        let app = create_router(test_state(100, 5));
        let response = login(&app, "wrong").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!response.headers().contains_key(header::SET_COOKIE));
    }

    #[tokio::test]
    async fn test_login_session_logout_flow() {
        let app = create_router(test_state(100, 5));

        let response = login(&app, "correct horse").await;
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = session_cookie_pair(&response);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "principal": "admin" })
        );

        let response = app
            .clone()
            .oneshot(
                request("GET", "/api/auth/session")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "authorized": true, "principal": "admin" })
        );

        let response = app
            .clone()
            .oneshot(
                request("POST", "/api/auth/logout")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cleared.starts_with("admin_session=;"));

        // 会话已吊销，旧 Cookie 不再有效
        let response = app
            .oneshot(
                request("GET", "/api/auth/session")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_without_cookie_succeeds() {
        let app = create_router(test_state(100, 5));
        let response = app
            .oneshot(request("POST", "/api/auth/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_has_its_own_stricter_limit() {
        let app = create_router(test_state(100, 2));
        assert_eq!(login(&app, "wrong").await.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(login(&app, "wrong").await.status(), StatusCode::UNAUTHORIZED);

        let response = login(&app, "correct horse").await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[X_RATELIMIT_LIMIT], "2");
    }

    async fn login_with_body(app: &Router, body: &'static str) -> axum::response::Response {
        app.clone()
            .oneshot(
                request("POST", "/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_malformed_login_body_is_unauthorized() {
        let app = create_router(test_state(100, 10));

        for body in ["{}", "not json", r#"{"username":"admin"}"#] {
            let response = login_with_body(&app, body).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", body);
            assert!(!response.headers().contains_key(header::SET_COOKIE));
            assert_eq!(
                body_json(response).await,
                serde_json::json!({ "error": "Unauthorized" })
            );
        }
    }

    #[tokio::test]
    async fn test_bad_path_and_query_return_json_400() {
        let app = create_router(test_state(100, 5));

        for uri in ["/api/products/not-a-uuid", "/api/slides?active=maybe"] {
            let response = app
                .clone()
                .oneshot(request("GET", uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body_json(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_malformed_admin_body_returns_json_400() {
        let app = create_router(test_state(100, 5));
        let cookie = session_cookie_pair(&login(&app, "correct horse").await);

        let response = app
            .oneshot(
                request("POST", "/api/products")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::COOKIE, &cookie)
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }
}
