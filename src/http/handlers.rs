//! Demo endpoints served behind the request log layer.

use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct TestRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestResponse {
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn echo(Json(body): Json<TestRequest>) -> Json<TestResponse> {
    Json(TestResponse {
        message: format!("Received: {}", body.name),
        timestamp: chrono::Utc::now().timestamp_millis(),
    })
}
