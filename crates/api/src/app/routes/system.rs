use axum::Json;
use axum::response::IntoResponse;

/// GET /health — public liveness probe (rule-table entry marks it public).
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
