use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{AppState, SERVICE_NAME};

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let database = if state.contacts.is_healthy().await {
        "connected"
    } else {
        tracing::error!("Database health check failed");
        "disconnected"
    };

    let cache = if state.cache.is_healthy().await {
        "connected"
    } else {
        "disconnected"
    };

    let body = json!({
        "status": if database == "connected" { "healthy" } else { "unhealthy" },
        "service": SERVICE_NAME,
        "database": database,
        "cache": { "status": cache, "backend": state.cache.backend() },
        "active_imports": state.imports.active_imports(),
        "timestamp": chrono::Utc::now()
    });

    if database == "connected" {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
