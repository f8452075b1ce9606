use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::services::calculator::{
    DeliveryStatistics, EngagementStatistics, PerformanceStatistics, SlaCompliance,
};
use crate::services::validators::HealthStatus;

/// Lookback window of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardPeriod {
    Hour,
    Day,
    Week,
    Month,
}

impl DashboardPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardPeriod::Hour => "hour",
            DashboardPeriod::Day => "day",
            DashboardPeriod::Week => "week",
            DashboardPeriod::Month => "month",
        }
    }

    pub fn lookback(&self) -> Duration {
        match self {
            DashboardPeriod::Hour => Duration::hours(1),
            DashboardPeriod::Day => Duration::days(1),
            DashboardPeriod::Week => Duration::weeks(1),
            DashboardPeriod::Month => Duration::days(30),
        }
    }
}

impl fmt::Display for DashboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlaMetrics {
    pub delivery_sla_compliance: Option<SlaCompliance>,
    pub performance_sla_compliance: Option<SlaCompliance>,
    pub overall_health_status: Option<HealthStatus>,
    pub breaches: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardCacheInfo {
    pub cache_key: String,
    pub cached_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub cache_hit: bool,
}

/// Dashboard payload. A section is null when the window has no valid metrics of its kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardMetrics {
    pub organization_id: String,
    pub time_period: DashboardPeriod,
    pub delivery_metrics: Option<DeliveryStatistics>,
    pub engagement_metrics: Option<EngagementStatistics>,
    pub system_metrics: Option<PerformanceStatistics>,
    pub sla_metrics: SlaMetrics,
    pub timestamp: DateTime<Utc>,
    pub cache_info: DashboardCacheInfo,
}
