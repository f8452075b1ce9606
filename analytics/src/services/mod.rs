pub mod aggregator;
pub mod calculator;
pub mod dashboard;
pub mod ingest;
pub mod report_service;
pub mod reports;
pub mod validators;

pub use dashboard::DashboardService;
pub use ingest::{IngestService, IngestSummary};
pub use report_service::ReportService;
pub use reports::ReportAssembler;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use courier_database::repositories::MetricStore;

use crate::errors::{AnalyticsError, AnalyticsResult};
use crate::models::{Metric, MetricType};

/// Runs a store call under the database timeout. Store failures and timeouts
/// both surface as dependency errors.
pub(crate) async fn with_db_timeout<T, F>(timeout: Duration, operation: &str, fut: F) -> AnalyticsResult<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::error!(operation = operation, error = ?e, "Database operation failed");
            Err(AnalyticsError::Dependency(format!("{} failed", operation)))
        }
        Err(_) => {
            tracing::error!(operation = operation, timeout_ms = timeout.as_millis() as u64, "Database operation timed out");
            Err(AnalyticsError::Dependency(format!("{} timed out", operation)))
        }
    }
}

pub(crate) async fn load_metrics(
    store: &Arc<dyn MetricStore>,
    timeout: Duration,
    organization_id: &str,
    metric_type: MetricType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AnalyticsResult<Vec<Metric>> {
    let rows = with_db_timeout(
        timeout,
        "load metrics",
        store.find_metrics(organization_id, metric_type.as_str(), start, end),
    )
    .await?;

    rows.into_iter().map(Metric::from_row).collect()
}
