use axum::Json;
use axum::response::IntoResponse;

pub(crate) async fn handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
