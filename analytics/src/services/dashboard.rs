use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use courier_config::ServiceSettings;
use courier_database::repositories::MetricStore;
use courier_database::{CacheKeyBuilder, TimedCache};
use courier_observability::log_sla_breach;

use crate::errors::{AnalyticsError, AnalyticsResult};
use crate::models::{DashboardCacheInfo, DashboardMetrics, DashboardPeriod, Metric, MetricType, SlaMetrics};
use crate::services::calculator::{
    delivery_statistics, engagement_statistics, performance_statistics, DeliveryStatistics,
    PerformanceStatistics, StatisticsConfig, RESOURCE_USAGE_LIMIT, RESPONSE_TIME_SLA_SECS,
};
use crate::services::load_metrics;
use crate::services::validators::DELIVERY_SLA_TARGET;
use crate::SERVICE_NAME;

#[derive(Clone)]
pub struct DashboardService {
    metrics: Arc<dyn MetricStore>,
    cache: TimedCache,
    config: StatisticsConfig,
    db_timeout: Duration,
    cache_ttl: Duration,
}

impl DashboardService {
    pub fn new(metrics: Arc<dyn MetricStore>, cache: TimedCache, settings: &ServiceSettings) -> Self {
        Self {
            metrics,
            cache,
            config: StatisticsConfig::default(),
            db_timeout: settings.db_timeout,
            cache_ttl: Duration::from_secs(settings.dashboard_cache_ttl_secs),
        }
    }

    /// Cached dashboard for the trailing window. `refresh_cache` skips the
    /// cache read but still rewrites the entry.
    pub async fn metrics(
        &self,
        organization_id: &str,
        period: DashboardPeriod,
        refresh_cache: bool,
    ) -> AnalyticsResult<DashboardMetrics> {
        let cache_key = CacheKeyBuilder::dashboard(organization_id, period.as_str());

        if !refresh_cache {
            if let Some(mut cached) = self.cache.get_json::<DashboardMetrics>(&cache_key).await {
                cached.cache_info.cache_hit = true;
                return Ok(cached);
            }
        }

        let now = Utc::now();
        let start = now - period.lookback();

        let message = self.load(organization_id, MetricType::Message, start, now).await?;
        let engagement = self.load(organization_id, MetricType::Engagement, start, now).await?;
        let system = self.load(organization_id, MetricType::System, start, now).await?;

        let delivery_metrics = section(delivery_statistics(&message, &self.config))?;
        let engagement_metrics = section(engagement_statistics(&engagement, &self.config))?;
        let system_metrics = section(performance_statistics(&system, &self.config))?;

        let breaches = sla_breaches(delivery_metrics.as_ref(), system_metrics.as_ref());
        if !breaches.is_empty() {
            tracing::warn!(
                organization_id = %organization_id,
                breaches = ?breaches,
                "SLA breach detected"
            );
            log_sla_breach(SERVICE_NAME, organization_id, &breaches);
        }

        let sla_metrics = SlaMetrics {
            delivery_sla_compliance: delivery_metrics.as_ref().map(|d| d.sla_compliance.clone()),
            performance_sla_compliance: system_metrics.as_ref().map(|s| s.response_time_sla.clone()),
            overall_health_status: system_metrics.as_ref().map(|s| s.health.overall_status),
            breaches,
        };

        let dashboard = DashboardMetrics {
            organization_id: organization_id.to_string(),
            time_period: period,
            delivery_metrics,
            engagement_metrics,
            system_metrics,
            sla_metrics,
            timestamp: now,
            cache_info: DashboardCacheInfo {
                cache_key: cache_key.clone(),
                cached_at: now,
                ttl_seconds: self.cache_ttl.as_secs(),
                cache_hit: false,
            },
        };

        self.cache.set_json(&cache_key, &dashboard, self.cache_ttl).await;
        Ok(dashboard)
    }

    async fn load(
        &self,
        organization_id: &str,
        metric_type: MetricType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<Metric>> {
        load_metrics(&self.metrics, self.db_timeout, organization_id, metric_type, start, end).await
    }
}

fn section<T>(result: AnalyticsResult<T>) -> AnalyticsResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AnalyticsError::InsufficientData(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Human-readable breach descriptions; empty when every present section is within SLA
pub fn sla_breaches(
    delivery: Option<&DeliveryStatistics>,
    system: Option<&PerformanceStatistics>,
) -> Vec<String> {
    let mut breaches = Vec::new();

    if let Some(delivery) = delivery {
        if delivery.average_delivery_rate < DELIVERY_SLA_TARGET {
            breaches.push(format!(
                "Average delivery rate {:.2}% below {:.1}%",
                delivery.average_delivery_rate, DELIVERY_SLA_TARGET
            ));
        }
    }

    if let Some(system) = system {
        if system.p95_response_time > RESPONSE_TIME_SLA_SECS {
            breaches.push(format!(
                "p95 response time {:.2}s above {:.1}s",
                system.p95_response_time, RESPONSE_TIME_SLA_SECS
            ));
        }
        if system.cpu_usage.peak > RESOURCE_USAGE_LIMIT {
            breaches.push(format!(
                "Peak CPU usage {:.1}% above {:.0}%",
                system.cpu_usage.peak, RESOURCE_USAGE_LIMIT
            ));
        }
    }

    breaches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricKind, SystemMetrics};
    use crate::services::validators::validate_metric;
    use chrono::Duration as ChronoDuration;
    use courier_database::repositories::MemoryStore;
    use courier_database::{CacheStore, MemoryCache};
    use std::collections::BTreeMap;

    fn service(store: Arc<MemoryStore>) -> DashboardService {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::default());
        DashboardService::new(
            store,
            TimedCache::new(cache, Duration::from_millis(500)),
            &ServiceSettings::with_defaults(SERVICE_NAME, 3020),
        )
    }

    async fn seed_system(store: &MemoryStore, response_time: f64, cpu: f64) {
        let mut metric = Metric::new(
            "org-1234",
            Utc::now() - ChronoDuration::minutes(10),
            MetricKind::System(SystemMetrics {
                response_time,
                cpu_usage: cpu,
                memory_usage: 40.0,
                concurrent_users: 5,
                error_counts: BTreeMap::new(),
            }),
        );
        validate_metric(&mut metric, Utc::now());
        store.insert_metrics(&[metric.to_row().unwrap()]).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_sections_are_null() {
        let store = Arc::new(MemoryStore::new());
        seed_system(&store, 0.4, 30.0).await;

        let dashboard = service(store)
            .metrics("org-1234", DashboardPeriod::Day, false)
            .await
            .unwrap();

        assert!(dashboard.delivery_metrics.is_none());
        assert!(dashboard.engagement_metrics.is_none());
        assert!(dashboard.system_metrics.is_some());
        assert!(dashboard.sla_metrics.breaches.is_empty());
        assert!(!dashboard.cache_info.cache_hit);
    }

    #[tokio::test]
    async fn test_cache_hit_and_refresh() {
        let store = Arc::new(MemoryStore::new());
        seed_system(&store, 0.4, 30.0).await;
        let service = service(store);

        service.metrics("org-1234", DashboardPeriod::Hour, false).await.unwrap();
        let cached = service.metrics("org-1234", DashboardPeriod::Hour, false).await.unwrap();
        assert!(cached.cache_info.cache_hit);

        let refreshed = service.metrics("org-1234", DashboardPeriod::Hour, true).await.unwrap();
        assert!(!refreshed.cache_info.cache_hit);
    }

    #[tokio::test]
    async fn test_breaches_reported() {
        let store = Arc::new(MemoryStore::new());
        seed_system(&store, 3.5, 95.0).await;

        let dashboard = service(store)
            .metrics("org-1234", DashboardPeriod::Week, false)
            .await
            .unwrap();

        assert_eq!(dashboard.sla_metrics.breaches.len(), 2);
        assert_eq!(
            dashboard.sla_metrics.overall_health_status,
            Some(crate::services::validators::HealthStatus::Warning)
        );
    }
}
