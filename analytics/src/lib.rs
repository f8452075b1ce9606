//! Analytics service: metric ingestion, statistical reports and the cached
//! SLA dashboard.

pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use courier_config::ServiceSettings;
use courier_database::repositories::{MetricStore, ReportStore};
use courier_database::TimedCache;

use services::{DashboardService, IngestService, ReportService};

pub const SERVICE_NAME: &str = "analytics-service";
pub const DEFAULT_PORT: u16 = 3020;

/// Services shared by every handler through `web::Data`
#[derive(Clone)]
pub struct AppState {
    pub reports: ReportService,
    pub dashboard: DashboardService,
    pub ingest: IngestService,
    pub metrics: Arc<dyn MetricStore>,
    pub cache: TimedCache,
    pub db_timeout: Duration,
}

impl AppState {
    pub fn new(
        metrics: Arc<dyn MetricStore>,
        reports: Arc<dyn ReportStore>,
        cache: TimedCache,
        settings: &ServiceSettings,
    ) -> Self {
        Self {
            reports: ReportService::new(metrics.clone(), reports, cache.clone(), settings),
            dashboard: DashboardService::new(metrics.clone(), cache.clone(), settings),
            ingest: IngestService::new(metrics.clone(), settings.db_timeout),
            metrics,
            cache,
            db_timeout: settings.db_timeout,
        }
    }
}
