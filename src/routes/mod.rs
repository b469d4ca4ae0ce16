pub mod auth;
pub mod category;
pub mod extract;
pub mod page;
pub mod product;
pub mod slide;
pub mod theme;

use axum::Json;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
