use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use courier_database::repositories::MetricStore;
use courier_observability::log_metrics_ingested;
use serde::{Deserialize, Serialize};

use crate::errors::{AnalyticsError, AnalyticsResult};
use crate::models::{Metric, MetricInput};
use crate::services::validators::{validate_batch, RejectedMetric};
use crate::services::with_db_timeout;
use crate::SERVICE_NAME;

pub const MAX_INGEST_BATCH: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestSummary {
    pub accepted: usize,
    pub rejected: Vec<RejectedMetric>,
}

/// Validates submitted metrics and persists the valid ones
#[derive(Clone)]
pub struct IngestService {
    metrics: Arc<dyn MetricStore>,
    db_timeout: Duration,
}

impl IngestService {
    pub fn new(metrics: Arc<dyn MetricStore>, db_timeout: Duration) -> Self {
        Self { metrics, db_timeout }
    }

    pub async fn ingest(&self, inputs: Vec<MetricInput>) -> AnalyticsResult<IngestSummary> {
        if inputs.is_empty() {
            return Err(AnalyticsError::Validation("metrics must not be empty".to_string()));
        }
        if inputs.len() > MAX_INGEST_BATCH {
            return Err(AnalyticsError::Validation(format!(
                "At most {} metrics per request",
                MAX_INGEST_BATCH
            )));
        }

        let started = Instant::now();
        let batch = validate_batch(inputs.into_iter().map(Metric::from).collect(), Utc::now());

        if !batch.accepted.is_empty() {
            let rows = batch
                .accepted
                .iter()
                .map(Metric::to_row)
                .collect::<AnalyticsResult<Vec<_>>>()?;
            with_db_timeout(self.db_timeout, "insert metrics", self.metrics.insert_metrics(&rows)).await?;
        }

        let summary = IngestSummary {
            accepted: batch.accepted.len(),
            rejected: batch.rejected,
        };
        log_metrics_ingested(
            SERVICE_NAME,
            summary.accepted,
            summary.rejected.len(),
            started.elapsed().as_millis() as u64,
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageMetrics, MetricKind};
    use chrono::Duration as ChronoDuration;
    use courier_database::repositories::MemoryStore;
    use serde_json::Map;
    use std::collections::BTreeMap;

    fn input(organization_id: &str, delivered: i64) -> MetricInput {
        MetricInput {
            organization_id: organization_id.to_string(),
            timestamp: Utc::now() - ChronoDuration::minutes(1),
            kind: MetricKind::Message(MessageMetrics {
                total_messages: 100,
                delivered_messages: delivered,
                failed_messages: 0,
                delivery_rate: 0.0,
                status_breakdown: BTreeMap::new(),
            }),
            metadata: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_partial_batch() {
        let store = Arc::new(MemoryStore::new());
        let service = IngestService::new(store.clone(), Duration::from_secs(5));

        let summary = service
            .ingest(vec![input("org-1234", 100), input("x", 100), input("org-1234", 200)])
            .await
            .unwrap();

        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected.len(), 2);
        assert_eq!(summary.rejected[0].index, 1);
        assert_eq!(summary.rejected[1].index, 2);
        assert_eq!(store.metric_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_limits() {
        let service = IngestService::new(Arc::new(MemoryStore::new()), Duration::from_secs(5));

        let empty = service.ingest(Vec::new()).await.unwrap_err();
        assert!(matches!(empty, AnalyticsError::Validation(_)));

        let oversized = (0..=MAX_INGEST_BATCH).map(|_| input("org-1234", 100)).collect();
        let err = service.ingest(oversized).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Validation(_)));
    }
}
