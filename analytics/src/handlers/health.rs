use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{AppState, SERVICE_NAME};

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let database = match tokio::time::timeout(state.db_timeout, state.metrics.ping()).await {
        Ok(Ok(())) => "connected",
        Ok(Err(e)) => {
            tracing::error!("Database health check failed: {}", e);
            "disconnected"
        }
        Err(_) => {
            tracing::error!("Database health check timed out");
            "disconnected"
        }
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
        "timestamp": chrono::Utc::now()
    });

    if database == "connected" {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
