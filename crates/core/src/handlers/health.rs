use axum::Json;
use serde_json::{Value, json};

pub(crate) async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
