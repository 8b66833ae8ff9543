use axum::Json;

use redress_shared::types::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("redress-auth", env!("CARGO_PKG_VERSION")))
}
