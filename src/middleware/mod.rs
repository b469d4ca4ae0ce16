mod auth;
mod error_handler;
mod rate_limit;

pub use auth::{AdminPrincipal, AdminSessionCheck, SessionVerdict, require_admin};
pub use error_handler::log_errors;
pub use rate_limit::{RateLimitGate, RateLimitOptions, client_key, rate_limit};
