pub mod donations;
pub mod webhooks;

pub use donations::*;
pub use webhooks::*;

use axum::{http::StatusCode, response::IntoResponse, response::Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    errors: String,
}

pub fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (
        status,
        Json(ErrorBody {
            errors: message.to_string(),
        }),
    )
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
