use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use courier_config::ServiceSettings;
use courier_database::models::ReportRow;
use courier_database::repositories::{MetricStore, ReportStore};
use courier_database::{CacheKeyBuilder, TimedCache};
use courier_observability::log_report_generated;
use uuid::Uuid;

use crate::errors::{AnalyticsError, AnalyticsResult};
use crate::models::{CacheInfo, Report, ReportRequest, ReportType};
use crate::services::reports::{validate_time_range, ReportAssembler};
use crate::services::{load_metrics, with_db_timeout};
use crate::SERVICE_NAME;

/// Generates reports with a read-through cache in front of the assembler
#[derive(Clone)]
pub struct ReportService {
    metrics: Arc<dyn MetricStore>,
    reports: Arc<dyn ReportStore>,
    cache: TimedCache,
    assembler: ReportAssembler,
    db_timeout: Duration,
    cache_ttl: Duration,
}

impl ReportService {
    pub fn new(
        metrics: Arc<dyn MetricStore>,
        reports: Arc<dyn ReportStore>,
        cache: TimedCache,
        settings: &ServiceSettings,
    ) -> Self {
        Self {
            metrics,
            reports,
            cache,
            assembler: ReportAssembler::default(),
            db_timeout: settings.db_timeout,
            cache_ttl: Duration::from_secs(settings.report_cache_ttl_secs),
        }
    }

    pub async fn generate(&self, request: ReportRequest, report_type: ReportType) -> AnalyticsResult<Report> {
        let started = Instant::now();
        let now = Utc::now();
        validate_time_range(request.start_time, request.end_time, now)?;

        let cache_key = CacheKeyBuilder::report(
            &request.organization_id,
            report_type.as_str(),
            &request.start_time,
            &request.end_time,
        );

        // The key carries no granularity, so a hit for another period is recomputed
        if let Some(mut cached) = self.cache.get_json::<Report>(&cache_key).await {
            if cached.time_period == request.time_period {
                cached.cache_info.cache_hit = true;
                log_report_generated(
                    SERVICE_NAME,
                    &request.organization_id,
                    &cached.report_id.to_string(),
                    report_type.as_str(),
                    true,
                    started.elapsed().as_millis() as u64,
                );
                return Ok(cached);
            }
            tracing::debug!(cache_key = %cache_key, "Cached report has a different time_period, recomputing");
        }

        let metrics = load_metrics(
            &self.metrics,
            self.db_timeout,
            &request.organization_id,
            report_type.metric_type(),
            request.start_time,
            request.end_time,
        )
        .await?;

        let cache_info = CacheInfo {
            cache_key: cache_key.clone(),
            ttl_seconds: self.cache_ttl.as_secs(),
            cache_hit: false,
        };
        let report = self
            .assembler
            .assemble(&request, report_type, &metrics, cache_info, now)?;

        let row = ReportRow {
            id: report.report_id,
            organization_id: report.organization_id.clone(),
            report_type: report_type.as_str().to_string(),
            start_time: report.time_range.start,
            end_time: report.time_range.end,
            document: serde_json::to_value(&report)?,
            generated_at: report.generated_at,
        };
        with_db_timeout(self.db_timeout, "save report", self.reports.save_report(&row)).await?;

        self.cache.set_json(&cache_key, &report, self.cache_ttl).await;

        log_report_generated(
            SERVICE_NAME,
            &report.organization_id,
            &report.report_id.to_string(),
            report_type.as_str(),
            false,
            started.elapsed().as_millis() as u64,
        );

        Ok(report)
    }

    pub async fn get_report(&self, report_id: Uuid, organization_id: &str) -> AnalyticsResult<Report> {
        let row = with_db_timeout(
            self.db_timeout,
            "load report",
            self.reports.find_report(&report_id, organization_id),
        )
        .await?
        .ok_or_else(|| AnalyticsError::NotFound(format!("Report not found: {}", report_id)))?;

        Ok(serde_json::from_value(row.document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageMetrics, Metric, MetricKind};
    use crate::services::aggregator::Granularity;
    use crate::services::validators::validate_metric;
    use actix_web::{http::StatusCode, ResponseError};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration};
    use courier_database::models::MetricRow;
    use courier_database::repositories::MemoryStore;
    use courier_database::{CacheStore, MemoryCache};
    use std::collections::BTreeMap;

    /// Cache whose reads fail outright and whose writes never complete
    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get_raw(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("connection refused")
        }

        async fn set_raw(&self, _key: &str, _value: String, _ttl: Duration) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        async fn delete(&self, _key: &str) -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }

        async fn ping(&self) -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    /// Metric store whose queries hang well past the database timeout
    struct StalledMetrics;

    #[async_trait]
    impl MetricStore for StalledMetrics {
        async fn insert_metrics(&self, _rows: &[MetricRow]) -> anyhow::Result<u64> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(0)
        }

        async fn find_metrics(
            &self,
            _organization_id: &str,
            _kind: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> anyhow::Result<Vec<MetricRow>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn ping(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn fast_settings() -> ServiceSettings {
        let mut settings = ServiceSettings::with_defaults(SERVICE_NAME, 3020);
        settings.db_timeout = Duration::from_millis(50);
        settings
    }

    fn service(store: Arc<MemoryStore>) -> ReportService {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::default());
        ReportService::new(
            store.clone(),
            store,
            TimedCache::new(cache, Duration::from_millis(500)),
            &ServiceSettings::with_defaults(SERVICE_NAME, 3020),
        )
    }

    async fn seed(store: &MemoryStore, ts: DateTime<Utc>, delivered: i64) {
        let mut metric = Metric::new(
            "org-1234",
            ts,
            MetricKind::Message(MessageMetrics {
                total_messages: 100,
                delivered_messages: delivered,
                failed_messages: 100 - delivered,
                delivery_rate: 0.0,
                status_breakdown: BTreeMap::new(),
            }),
        );
        validate_metric(&mut metric, Utc::now());
        store.insert_metrics(&[metric.to_row().unwrap()]).await.unwrap();
    }

    fn request(start: DateTime<Utc>, end: DateTime<Utc>, period: Granularity) -> ReportRequest {
        ReportRequest {
            organization_id: "org-1234".to_string(),
            start_time: start,
            end_time: end,
            time_period: period,
        }
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let store = Arc::new(MemoryStore::new());
        let end = Utc::now() - ChronoDuration::minutes(1);
        let start = end - ChronoDuration::hours(6);
        seed(&store, start + ChronoDuration::minutes(30), 99).await;

        let service = service(store.clone());
        let first = service
            .generate(request(start, end, Granularity::Hourly), ReportType::Delivery)
            .await
            .unwrap();
        assert!(!first.cache_info.cache_hit);
        assert_eq!(first.cache_info.ttl_seconds, 300);

        let second = service
            .generate(request(start, end, Granularity::Hourly), ReportType::Delivery)
            .await
            .unwrap();
        assert!(second.cache_info.cache_hit);
        assert_eq!(second.report_id, first.report_id);

        let stored = service.get_report(first.report_id, "org-1234").await.unwrap();
        assert_eq!(stored.report_id, first.report_id);
    }

    #[tokio::test]
    async fn test_different_period_is_recomputed() {
        let store = Arc::new(MemoryStore::new());
        let end = Utc::now() - ChronoDuration::minutes(1);
        let start = end - ChronoDuration::days(3);
        seed(&store, start + ChronoDuration::hours(1), 100).await;

        let service = service(store);
        let hourly = service
            .generate(request(start, end, Granularity::Hourly), ReportType::Delivery)
            .await
            .unwrap();
        let daily = service
            .generate(request(start, end, Granularity::Daily), ReportType::Delivery)
            .await
            .unwrap();

        assert!(!daily.cache_info.cache_hit);
        assert_ne!(daily.report_id, hourly.report_id);
        assert_eq!(daily.buckets.len(), 3);
    }

    #[tokio::test]
    async fn test_failing_cache_is_bypassed() {
        let store = Arc::new(MemoryStore::new());
        let end = Utc::now() - ChronoDuration::minutes(1);
        let start = end - ChronoDuration::hours(2);
        seed(&store, start + ChronoDuration::minutes(10), 98).await;

        let cache: Arc<dyn CacheStore> = Arc::new(BrokenCache);
        let service = ReportService::new(
            store.clone(),
            store,
            TimedCache::new(cache, Duration::from_millis(50)),
            &ServiceSettings::with_defaults(SERVICE_NAME, 3020),
        );

        let first = service
            .generate(request(start, end, Granularity::Hourly), ReportType::Delivery)
            .await
            .unwrap();
        let second = service
            .generate(request(start, end, Granularity::Hourly), ReportType::Delivery)
            .await
            .unwrap();

        assert!(!first.cache_info.cache_hit);
        assert!(!second.cache_info.cache_hit);
        assert_ne!(first.report_id, second.report_id);
        assert_eq!(first.statistics, second.statistics);
    }

    #[tokio::test]
    async fn test_stalled_metric_store_is_a_dependency_error() {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::default());
        let service = ReportService::new(
            Arc::new(StalledMetrics),
            Arc::new(MemoryStore::new()),
            TimedCache::new(cache, Duration::from_millis(50)),
            &fast_settings(),
        );

        let end = Utc::now() - ChronoDuration::minutes(1);
        let err = service
            .generate(request(end - ChronoDuration::hours(1), end, Granularity::Hourly), ReportType::Delivery)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalyticsError::Dependency(_)));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_report_is_not_found() {
        let service = service(Arc::new(MemoryStore::new()));
        let err = service.get_report(Uuid::new_v4(), "org-1234").await.unwrap_err();
        assert!(matches!(err, AnalyticsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_no_metrics_is_insufficient_data() {
        let service = service(Arc::new(MemoryStore::new()));
        let end = Utc::now() - ChronoDuration::minutes(1);
        let err = service
            .generate(request(end - ChronoDuration::hours(1), end, Granularity::Hourly), ReportType::System)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData(_)));
    }
}
