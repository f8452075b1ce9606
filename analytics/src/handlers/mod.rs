pub mod dashboard;
pub mod health;
pub mod metrics;
pub mod reports;

use actix_web::{web, HttpRequest};

use crate::errors::AnalyticsError;
use crate::services::validators::is_valid_organization_id;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/reports")
                .route("/delivery", web::post().to(reports::delivery_report))
                .route("/engagement", web::post().to(reports::engagement_report))
                .route("/system", web::post().to(reports::system_report))
                .route("/{report_id}", web::get().to(reports::get_report)),
        )
        .route("/dashboard/metrics", web::get().to(dashboard::dashboard_metrics))
        .route("/metrics", web::post().to(metrics::ingest_metrics));
}

/// Malformed JSON bodies become validation errors instead of actix's plain-text 400
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(4 * 1024 * 1024)
        .error_handler(|err, _req: &HttpRequest| AnalyticsError::Validation(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req: &HttpRequest| AnalyticsError::Validation(err.to_string()).into())
}

pub(crate) fn require_organization_id(organization_id: &str) -> Result<(), AnalyticsError> {
    if is_valid_organization_id(organization_id) {
        Ok(())
    } else {
        Err(AnalyticsError::Validation(
            "Invalid organization_id format".to_string(),
        ))
    }
}
