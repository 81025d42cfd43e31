use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::formatter::iso_now;

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "timestamp": iso_now(),
        })),
    )
}
