//! Time-bucketed aggregation of metrics.
//!
//! Buckets are anchored at the range start and stepped by the granularity;
//! every step is emitted even when no metric lands in it.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AnalyticsError, AnalyticsResult};
use crate::models::{Metric, MetricType};
use crate::services::calculator::{percentile, SlaThreshold};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Hourly,
    Daily,
    Weekly,
}

impl Granularity {
    pub fn step(&self) -> Duration {
        match self {
            Granularity::Hourly => Duration::hours(1),
            Granularity::Daily => Duration::days(1),
            Granularity::Weekly => Duration::weeks(1),
        }
    }

    pub fn step_hours(&self) -> i64 {
        self.step().num_hours()
    }

    fn label(&self, start: DateTime<Utc>) -> String {
        match self {
            Granularity::Hourly => start.format("%Y-%m-%dT%H:00").to_string(),
            Granularity::Daily => start.format("%Y-%m-%d").to_string(),
            Granularity::Weekly => format!("week-of-{}", start.format("%Y-%m-%d")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationOptions {
    /// Keep running accumulators only; when false, per-bucket samples are
    /// retained and p50/p95 of the primary field are reported.
    pub memory_efficient: bool,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self { memory_efficient: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSummary {
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    fn merge(&mut self, other: &Accumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    fn summary(&self) -> Option<FieldSummary> {
        (self.count > 0).then(|| FieldSummary {
            sum: self.sum,
            mean: (self.sum / self.count as f64).clamp(self.min, self.max),
            min: self.min,
            max: self.max,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeBucket {
    pub period: Granularity,
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: usize,
    /// `None` for every field when the bucket is empty
    pub fields: BTreeMap<String, Option<FieldSummary>>,
    pub percentiles: Option<BTreeMap<String, f64>>,
}

impl TimeBucket {
    pub fn primary_mean(&self, metric_type: MetricType) -> Option<f64> {
        self.fields
            .get(metric_type.primary_field())
            .and_then(|f| f.as_ref())
            .map(|f| f.mean)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregationSummary {
    pub metric_type: MetricType,
    pub total_count: usize,
    pub non_empty_buckets: usize,
    pub fields: BTreeMap<String, Option<FieldSummary>>,
    pub sla: Option<SlaThreshold>,
    /// Non-empty buckets whose mean primary value misses the SLA
    pub sla_breach_count: usize,
    /// Whether the overall mean meets the SLA; `None` without data or SLA
    pub compliant: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Aggregation {
    pub granularity: Granularity,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub buckets: Vec<TimeBucket>,
    pub summary: AggregationSummary,
    /// Invalid metrics and ones outside the range or of another family
    pub dropped: usize,
}

struct BucketState {
    count: usize,
    fields: Vec<Accumulator>,
    samples: Vec<f64>,
}

/// Step starts `start, start + step, ...` strictly before `end`.
pub fn bucket_starts(start: DateTime<Utc>, end: DateTime<Utc>, granularity: Granularity) -> Vec<DateTime<Utc>> {
    let step = granularity.step();
    let mut starts = Vec::new();
    let mut cursor = start;
    while cursor < end {
        starts.push(cursor);
        cursor += step;
    }
    starts
}

pub fn aggregate(
    metrics: &[Metric],
    metric_type: MetricType,
    granularity: Granularity,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    options: AggregationOptions,
) -> AnalyticsResult<Aggregation> {
    if end <= start {
        return Err(AnalyticsError::Validation(
            "Aggregation range end must be after start".to_string(),
        ));
    }

    let field_names = metric_type.fields();
    let starts = bucket_starts(start, end, granularity);
    let step_secs = granularity.step().num_seconds();

    let mut states: Vec<BucketState> = starts
        .iter()
        .map(|_| BucketState {
            count: 0,
            fields: vec![Accumulator::default(); field_names.len()],
            samples: Vec::new(),
        })
        .collect();

    let mut dropped = 0;
    for metric in metrics {
        if !metric.is_valid
            || metric.metric_type() != metric_type
            || metric.timestamp < start
            || metric.timestamp >= end
        {
            dropped += 1;
            continue;
        }

        let index = ((metric.timestamp - start).num_seconds() / step_secs) as usize;
        let Some(state) = states.get_mut(index) else {
            dropped += 1;
            continue;
        };

        state.count += 1;
        for (acc, field) in state.fields.iter_mut().zip(field_names) {
            if let Some(value) = metric.kind.field_value(field) {
                acc.push(value);
            }
        }
        if !options.memory_efficient {
            state.samples.push(metric.kind.primary_value());
        }
    }

    let mut totals = vec![Accumulator::default(); field_names.len()];
    let sla = SlaThreshold::for_metric_type(metric_type);
    let mut sla_breach_count = 0;
    let mut total_count = 0;
    let mut non_empty_buckets = 0;

    let buckets: Vec<TimeBucket> = starts
        .iter()
        .zip(states.iter_mut())
        .map(|(bucket_start, state)| {
            let bucket_end = (*bucket_start + granularity.step()).min(end);

            total_count += state.count;
            if state.count > 0 {
                non_empty_buckets += 1;
            }
            for (total, acc) in totals.iter_mut().zip(&state.fields) {
                total.merge(acc);
            }

            if let (Some(threshold), Some(primary)) = (sla, state.fields[0].summary()) {
                if !threshold.meets(primary.mean) {
                    sla_breach_count += 1;
                }
            }

            let percentiles = if options.memory_efficient || state.samples.is_empty() {
                None
            } else {
                state.samples.sort_by(|a, b| a.total_cmp(b));
                Some(BTreeMap::from([
                    ("p50".to_string(), percentile(&state.samples, 50.0)),
                    ("p95".to_string(), percentile(&state.samples, 95.0)),
                ]))
            };

            TimeBucket {
                period: granularity,
                label: granularity.label(*bucket_start),
                start: *bucket_start,
                end: bucket_end,
                count: state.count,
                fields: field_names
                    .iter()
                    .zip(&state.fields)
                    .map(|(name, acc)| (name.to_string(), acc.summary()))
                    .collect(),
                percentiles,
            }
        })
        .collect();

    let fields: BTreeMap<String, Option<FieldSummary>> = field_names
        .iter()
        .zip(&totals)
        .map(|(name, acc)| (name.to_string(), acc.summary()))
        .collect();

    let compliant = match (sla, totals[0].summary()) {
        (Some(threshold), Some(primary)) => Some(threshold.meets(primary.mean)),
        _ => None,
    };

    Ok(Aggregation {
        granularity,
        start,
        end,
        buckets,
        summary: AggregationSummary {
            metric_type,
            total_count,
            non_empty_buckets,
            fields,
            sla,
            sla_breach_count,
            compliant,
        },
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageMetrics, MetricKind};
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn message_at(offset: Duration, total: i64, delivered: i64) -> Metric {
        let mut metric = Metric::new(
            "org-1234",
            start() + offset,
            MetricKind::Message(MessageMetrics {
                total_messages: total,
                delivered_messages: delivered,
                failed_messages: total - delivered,
                delivery_rate: crate::services::validators::delivery_rate(total, delivered),
                status_breakdown: BTreeMap::new(),
            }),
        );
        metric.is_valid = true;
        metric
    }

    #[test]
    fn test_hourly_day_has_24_buckets() {
        let result = aggregate(
            &[],
            MetricType::Message,
            Granularity::Hourly,
            start(),
            start() + Duration::hours(24),
            AggregationOptions::default(),
        )
        .unwrap();

        assert_eq!(result.buckets.len(), 24);
        assert!(result.buckets.iter().all(|b| b.count == 0));
        assert!(result.buckets[0].fields["delivery_rate"].is_none());
        assert_eq!(result.summary.compliant, None);
    }

    #[test]
    fn test_partial_last_bucket_is_clamped() {
        let end = start() + Duration::hours(50);
        let result = aggregate(&[], MetricType::Message, Granularity::Daily, start(), end, AggregationOptions::default())
            .unwrap();

        assert_eq!(result.buckets.len(), 3);
        assert_eq!(result.buckets[2].end, end);
    }

    #[test]
    fn test_metrics_land_in_their_bucket() {
        let metrics = vec![
            message_at(Duration::minutes(10), 100, 100),
            message_at(Duration::minutes(50), 100, 90),
            message_at(Duration::hours(2), 100, 99),
            message_at(Duration::hours(30), 100, 100),
        ];

        let result = aggregate(
            &metrics,
            MetricType::Message,
            Granularity::Hourly,
            start(),
            start() + Duration::hours(24),
            AggregationOptions::default(),
        )
        .unwrap();

        let first = &result.buckets[0];
        assert_eq!(first.count, 2);
        let rate = first.fields["delivery_rate"].as_ref().unwrap();
        assert_eq!(rate.mean, 95.0);
        assert_eq!(rate.min, 90.0);
        assert_eq!(first.fields["total_messages"].as_ref().unwrap().sum, 200.0);

        assert_eq!(result.dropped, 1);
        assert_eq!(result.summary.total_count, 3);
        assert_eq!(result.summary.non_empty_buckets, 2);
        // Bucket 0 averages 95 (< 99), bucket 2 averages 99
        assert_eq!(result.summary.sla_breach_count, 1);
        assert_eq!(result.summary.compliant, Some(false));
        assert!(first.percentiles.is_none());
    }

    #[test]
    fn test_invalid_metrics_are_dropped() {
        let mut invalid = message_at(Duration::minutes(5), 100, 0);
        invalid.is_valid = false;
        let metrics = vec![message_at(Duration::minutes(1), 100, 100), invalid];

        let result = aggregate(
            &metrics,
            MetricType::Message,
            Granularity::Hourly,
            start(),
            start() + Duration::hours(1),
            AggregationOptions { memory_efficient: false },
        )
        .unwrap();

        let bucket = &result.buckets[0];
        assert_eq!(bucket.count, 1);
        assert_eq!(bucket.fields["delivery_rate"].as_ref().unwrap().min, 100.0);
        assert_eq!(bucket.percentiles.as_ref().unwrap()["p50"], 100.0);
        assert_eq!(result.dropped, 1);
        assert_eq!(result.summary.compliant, Some(true));
    }

    #[test]
    fn test_bucket_mean_stays_within_extremes() {
        let metrics: Vec<Metric> = (0..10)
            .map(|i| {
                let mut metric = message_at(Duration::minutes(i), 10, 1);
                if let MetricKind::Message(m) = &mut metric.kind {
                    m.delivery_rate = 0.1;
                }
                metric
            })
            .collect();

        let result = aggregate(
            &metrics,
            MetricType::Message,
            Granularity::Hourly,
            start(),
            start() + Duration::hours(1),
            AggregationOptions::default(),
        )
        .unwrap();

        let rate = result.buckets[0].fields["delivery_rate"].as_ref().unwrap();
        assert!(rate.min <= rate.mean && rate.mean <= rate.max);
        assert_eq!(rate.mean, 0.1);
    }

    #[test]
    fn test_sample_retention_adds_percentiles() {
        let metrics = vec![
            message_at(Duration::minutes(1), 100, 90),
            message_at(Duration::minutes(2), 100, 100),
        ];

        let result = aggregate(
            &metrics,
            MetricType::Message,
            Granularity::Hourly,
            start(),
            start() + Duration::hours(1),
            AggregationOptions { memory_efficient: false },
        )
        .unwrap();

        let percentiles = result.buckets[0].percentiles.as_ref().unwrap();
        assert_eq!(percentiles["p50"], 95.0);
        assert!((percentiles["p95"] - 99.5).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_inverted_range() {
        let result = aggregate(
            &[],
            MetricType::System,
            Granularity::Hourly,
            start(),
            start(),
            AggregationOptions::default(),
        );
        assert!(matches!(result, Err(AnalyticsError::Validation(_))));
    }
}
