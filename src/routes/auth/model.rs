use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub principal: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authorized: bool,
    pub principal: String,
}
