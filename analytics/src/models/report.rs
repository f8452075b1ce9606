use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::metric::MetricType;
use crate::services::aggregator::{AggregationSummary, Granularity, TimeBucket};
use crate::services::calculator::{
    DeliveryStatistics, EngagementStatistics, PerformanceStatistics, SlaCompliance, TrendDirection,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Delivery,
    Engagement,
    System,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Delivery => "delivery",
            ReportType::Engagement => "engagement",
            ReportType::System => "system",
        }
    }

    /// Metric family the report is computed from
    pub fn metric_type(&self) -> MetricType {
        match self {
            ReportType::Delivery => MetricType::Message,
            ReportType::Engagement => MetricType::Engagement,
            ReportType::System => MetricType::System,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetentionPolicy {
    pub policy: String,
    pub retention_days: u32,
    pub compress_after_30_days: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            policy: "standard".to_string(),
            retention_days: 90,
            compress_after_30_days: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationRules {
    pub completeness_threshold: f64,
    pub freshness_minutes: u32,
    pub consistency_checks: Vec<String>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            completeness_threshold: 0.95,
            freshness_minutes: 60,
            consistency_checks: vec![
                "total_count_matches".to_string(),
                "no_negative_values".to_string(),
                "timestamp_sequence".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportTimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportMetadata {
    pub created_at: DateTime<Utc>,
    pub version: String,
    pub report_type: ReportType,
    pub time_range: ReportTimeRange,
    pub data_retention: RetentionPolicy,
    pub validation_rules: ValidationRules,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartitionPlan {
    pub strategy: Granularity,
    pub step_hours: i64,
    pub partition_count: i64,
    pub boundaries: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheInfo {
    pub cache_key: String,
    pub ttl_seconds: u64,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HourlyPattern {
    /// Mean delivery rate keyed by zero-padded UTC hour of day ("00".."23")
    pub by_hour: BTreeMap<String, f64>,
    pub peak_hour: Option<u32>,
    pub trough_hour: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryTrends {
    pub direction: TrendDirection,
    pub correlation: Option<f64>,
    pub rolling_delivery_rate: Vec<Option<f64>>,
    pub hourly_pattern: HourlyPattern,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViolationPeriod {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub mean_delivery_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureAnalysis {
    pub total_failures: i64,
    pub failure_rate: f64,
    pub status_breakdown: BTreeMap<String, i64>,
    pub violation_periods: Vec<ViolationPeriod>,
}

/// Report-type specific content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReportKind {
    Delivery {
        weighted_delivery_rate: f64,
        statistics: DeliveryStatistics,
        trends: DeliveryTrends,
        failure_analysis: FailureAnalysis,
    },
    Engagement {
        statistics: EngagementStatistics,
        direction: TrendDirection,
        rolling_engagement_rate: Vec<Option<f64>>,
    },
    System {
        statistics: PerformanceStatistics,
        response_time_direction: TrendDirection,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub report_id: Uuid,
    pub organization_id: String,
    pub report_type: ReportType,
    pub time_period: Granularity,
    pub time_range: TimeRange,
    pub metadata: ReportMetadata,
    pub time_partitions: PartitionPlan,
    pub statistics: ReportKind,
    pub sla_compliance: Option<SlaCompliance>,
    pub buckets: Vec<TimeBucket>,
    pub summary: AggregationSummary,
    pub generated_at: DateTime<Utc>,
    pub cache_info: CacheInfo,
}

/// Body of the report endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportRequest {
    #[validate(length(min = 4, max = 100, message = "organization_id must be 4-100 characters"))]
    pub organization_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub time_period: Granularity,
}
