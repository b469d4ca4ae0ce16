use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use storefront_admin::{
    AppState,
    cache::{
        SessionStore, SlidingWindowCounter,
        operations::{JwtSessionStore, MemorySessionStore, RedisSessionStore, now_millis},
    },
    config::{Config, SessionBackend},
    middleware::{AdminSessionCheck, RateLimitGate, RateLimitOptions},
    router::create_router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    if config.run_migrations {
        sqlx::migrate!()
            .run(&pool)
            .await
            .expect("Failed to run database migrations");
    }

    // 会话存储
    let store: Arc<dyn SessionStore> = match config.session_backend {
        SessionBackend::Redis => {
            let url = config.redis_url.clone().expect("REDIS_URL is required");
            let client = redis::Client::open(url).expect("Failed to create Redis client");
            Arc::new(RedisSessionStore::new(Arc::new(client)))
        }
        SessionBackend::Memory => {
            tracing::warn!("Using in-memory session store; sessions are lost on restart");
            Arc::new(MemorySessionStore::new())
        }
        SessionBackend::Jwt => {
            let secret = config.jwt_secret.as_deref().expect("JWT_SECRET is required");
            Arc::new(JwtSessionStore::new(secret))
        }
    };
    tracing::info!("Session backend: {:?}", config.session_backend);

    // 设置限流器，全局与登录各自独立计数
    let api_counter = Arc::new(
        SlidingWindowCounter::new(config.counter_mode()).with_max_keys(config.rate_limit_max_keys),
    );
    let login_counter = Arc::new(
        SlidingWindowCounter::new(config.counter_mode()).with_max_keys(config.rate_limit_max_keys),
    );
    tracing::info!(
        "Rate limiting: {} requests / {} ms ({:?} mode)",
        config.rate_limit_requests,
        config.rate_limit_window_ms,
        api_counter.mode()
    );

    if let Some(secs) = config.rate_limit_sweep_secs {
        spawn_sweeper(
            vec![api_counter.clone(), login_counter.clone()],
            Duration::from_secs(secs),
        );
    }

    let state = AppState {
        pool,
        config: config.clone(),
        sessions: AdminSessionCheck::new(store),
        api_limiter: RateLimitGate::new(
            api_counter,
            RateLimitOptions {
                window_ms: config.rate_limit_window_ms,
                max: config.rate_limit_requests,
            },
        ),
        login_limiter: RateLimitGate::new(
            login_counter,
            RateLimitOptions {
                window_ms: config.login_rate_limit_window_ms,
                max: config.login_rate_limit_requests,
            },
        ),
    };

    let router = create_router(state);

    // 开发模式允许跨域
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

/// 定期清理过期的限流窗口
fn spawn_sweeper(counters: Vec<Arc<SlidingWindowCounter>>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let now = now_millis();
            let removed: usize = counters.iter().map(|c| c.sweep_expired(now)).sum();
            if removed > 0 {
                tracing::debug!("Rate limit sweep removed {} windows", removed);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
