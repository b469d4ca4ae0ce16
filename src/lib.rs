use config::Config;
use middleware::{AdminSessionCheck, RateLimitGate};
use sqlx::PgPool;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub sessions: AdminSessionCheck,
    pub api_limiter: RateLimitGate,
    pub login_limiter: RateLimitGate,
}
