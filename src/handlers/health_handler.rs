//! handlers/health_handler.rs
use actix_web::HttpResponse;
use serde_json::json;

/// GET /health. No toca la base de datos.
pub async fn health_endpoint() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "viasuc-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
