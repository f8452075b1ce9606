//! Report assembly: range checks, partitioning and the per-type report bodies.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use uuid::Uuid;

use crate::errors::{AnalyticsError, AnalyticsResult};
use crate::models::{
    CacheInfo, DeliveryTrends, FailureAnalysis, HourlyPattern, Metric, MetricType, PartitionPlan,
    Report, ReportKind, ReportMetadata, ReportRequest, ReportTimeRange, ReportType,
    RetentionPolicy, TimeRange, ValidationRules, ViolationPeriod,
};
use crate::services::aggregator::{aggregate, Aggregation, AggregationOptions, Granularity};
use crate::services::calculator::{
    delivery_statistics, engagement_statistics, index_correlation, performance_statistics,
    rolling_mean, trend_direction, SlaCompliance, StatisticsConfig, TREND_WINDOW,
};
use crate::services::validators::{delivery_rate, round2, DELIVERY_SLA_TARGET};

pub const MAX_REPORT_RANGE_DAYS: i64 = 90;
pub const REPORT_VERSION: &str = "1.0.0";

pub fn validate_time_range(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> AnalyticsResult<()> {
    if end <= start {
        return Err(AnalyticsError::InvalidTimeRange(
            "end_time must be after start_time".to_string(),
        ));
    }
    if end > now {
        return Err(AnalyticsError::InvalidTimeRange(
            "end_time cannot be in the future".to_string(),
        ));
    }
    if end - start > Duration::days(MAX_REPORT_RANGE_DAYS) {
        return Err(AnalyticsError::InvalidTimeRange(format!(
            "Time range cannot exceed {} days",
            MAX_REPORT_RANGE_DAYS
        )));
    }
    Ok(())
}

/// Storage partitioning hint: hourly up to a day, daily up to a week, weekly beyond.
pub fn partition_plan(start: DateTime<Utc>, end: DateTime<Utc>) -> PartitionPlan {
    let hours = (end - start).num_seconds() as f64 / 3600.0;
    let strategy = if hours <= 24.0 {
        Granularity::Hourly
    } else if hours <= 168.0 {
        Granularity::Daily
    } else {
        Granularity::Weekly
    };

    let step = strategy.step();
    let mut boundaries = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        boundaries.push(cursor);
        cursor += step;
    }

    PartitionPlan {
        strategy,
        step_hours: strategy.step_hours(),
        partition_count: (hours / strategy.step_hours() as f64).floor() as i64,
        boundaries,
    }
}

pub fn report_metadata(report_type: ReportType, range: &TimeRange, now: DateTime<Utc>) -> ReportMetadata {
    ReportMetadata {
        created_at: now,
        version: REPORT_VERSION.to_string(),
        report_type,
        time_range: ReportTimeRange {
            start: range.start,
            end: range.end,
            duration_hours: range.duration_hours(),
        },
        data_retention: RetentionPolicy::default(),
        validation_rules: ValidationRules::default(),
    }
}

/// Builds reports from already-loaded metrics. Pure: no I/O.
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    config: StatisticsConfig,
    options: AggregationOptions,
}

impl ReportAssembler {
    pub fn new(config: StatisticsConfig, options: AggregationOptions) -> Self {
        Self { config, options }
    }

    pub fn assemble(
        &self,
        request: &ReportRequest,
        report_type: ReportType,
        metrics: &[Metric],
        cache_info: CacheInfo,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<Report> {
        validate_time_range(request.start_time, request.end_time, now)?;

        let time_range = TimeRange {
            start: request.start_time,
            end: request.end_time,
        };

        let mut series: Vec<&Metric> = metrics
            .iter()
            .filter(|m| m.is_valid && m.metric_type() == report_type.metric_type())
            .collect();
        series.sort_by_key(|m| m.timestamp);

        let aggregation = aggregate(
            metrics,
            report_type.metric_type(),
            request.time_period,
            time_range.start,
            time_range.end,
            self.options,
        )?;

        let (statistics, sla_compliance) = match report_type {
            ReportType::Delivery => self.delivery_body(metrics, &series, &aggregation)?,
            ReportType::Engagement => {
                let statistics = engagement_statistics(metrics, &self.config)?;
                let rates: Vec<f64> = series
                    .iter()
                    .filter_map(|m| m.as_engagement())
                    .map(|e| e.engagement_rate)
                    .collect();
                let body = ReportKind::Engagement {
                    statistics,
                    direction: trend_direction(&rates),
                    rolling_engagement_rate: rolling_mean(&rates, TREND_WINDOW),
                };
                (body, None)
            }
            ReportType::System => {
                let statistics = performance_statistics(metrics, &self.config)?;
                // Negated so that falling latency reads as improving
                let inverted: Vec<f64> = series
                    .iter()
                    .filter_map(|m| m.as_system())
                    .map(|s| -s.response_time)
                    .collect();
                let sla = statistics.response_time_sla.clone();
                let body = ReportKind::System {
                    statistics,
                    response_time_direction: trend_direction(&inverted),
                };
                (body, Some(sla))
            }
        };

        Ok(Report {
            report_id: Uuid::new_v4(),
            organization_id: request.organization_id.clone(),
            report_type,
            time_period: request.time_period,
            metadata: report_metadata(report_type, &time_range, now),
            time_partitions: partition_plan(time_range.start, time_range.end),
            time_range,
            statistics,
            sla_compliance,
            buckets: aggregation.buckets,
            summary: aggregation.summary,
            generated_at: now,
            cache_info,
        })
    }

    fn delivery_body(
        &self,
        metrics: &[Metric],
        series: &[&Metric],
        aggregation: &Aggregation,
    ) -> AnalyticsResult<(ReportKind, Option<SlaCompliance>)> {
        let statistics = delivery_statistics(metrics, &self.config)?;

        let rates: Vec<f64> = series
            .iter()
            .filter_map(|m| m.as_message())
            .map(|m| m.delivery_rate)
            .collect();

        let trends = DeliveryTrends {
            direction: trend_direction(&rates),
            correlation: index_correlation(&rates).map(round2),
            rolling_delivery_rate: rolling_mean(&rates, TREND_WINDOW),
            hourly_pattern: hourly_pattern(series),
        };

        let mut status_breakdown = BTreeMap::new();
        for message in series.iter().filter_map(|m| m.as_message()) {
            for (status, count) in &message.status_breakdown {
                let total = status_breakdown.entry(status.clone()).or_insert(0i64);
                *total = total.saturating_add(*count);
            }
        }

        let violation_periods = aggregation
            .buckets
            .iter()
            .filter_map(|bucket| {
                let mean = bucket.primary_mean(MetricType::Message)?;
                (mean < DELIVERY_SLA_TARGET).then(|| ViolationPeriod {
                    label: bucket.label.clone(),
                    start: bucket.start,
                    end: bucket.end,
                    mean_delivery_rate: round2(mean),
                })
            })
            .collect();

        let failure_analysis = FailureAnalysis {
            total_failures: statistics.failed_messages,
            failure_rate: if statistics.total_messages > 0 {
                round2(statistics.failed_messages as f64 / statistics.total_messages as f64 * 100.0)
            } else {
                0.0
            },
            status_breakdown,
            violation_periods,
        };

        let sla = statistics.sla_compliance.clone();
        let body = ReportKind::Delivery {
            weighted_delivery_rate: delivery_rate(statistics.total_messages, statistics.delivered_messages),
            statistics,
            trends,
            failure_analysis,
        };
        Ok((body, Some(sla)))
    }
}

/// Mean delivery rate per UTC hour of day with the best and worst hours
fn hourly_pattern(series: &[&Metric]) -> HourlyPattern {
    let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for metric in series {
        if let Some(message) = metric.as_message() {
            let slot = sums.entry(metric.timestamp.hour()).or_insert((0.0, 0));
            slot.0 += message.delivery_rate;
            slot.1 += 1;
        }
    }

    let means: Vec<(u32, f64)> = sums
        .into_iter()
        .map(|(hour, (sum, count))| (hour, round2(sum / count as f64)))
        .collect();

    let peak_hour = means
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(hour, _)| *hour);
    let trough_hour = means
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(hour, _)| *hour);

    HourlyPattern {
        by_hour: means
            .into_iter()
            .map(|(hour, rate)| (format!("{:02}", hour), rate))
            .collect(),
        peak_hour,
        trough_hour,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageMetrics, MetricKind, SystemMetrics};
    use crate::services::calculator::TrendDirection;
    use crate::services::validators::validate_metric;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap()
    }

    fn message_at(ts: DateTime<Utc>, total: i64, delivered: i64) -> Metric {
        let mut metric = Metric::new(
            "org-1234",
            ts,
            MetricKind::Message(MessageMetrics {
                total_messages: total,
                delivered_messages: delivered,
                failed_messages: total - delivered,
                delivery_rate: 0.0,
                status_breakdown: BTreeMap::from([("failed".to_string(), total - delivered)]),
            }),
        );
        validate_metric(&mut metric, now());
        metric
    }

    fn request(start: DateTime<Utc>, end: DateTime<Utc>) -> ReportRequest {
        ReportRequest {
            organization_id: "org-1234".to_string(),
            start_time: start,
            end_time: end,
            time_period: Granularity::Hourly,
        }
    }

    fn cache_info() -> CacheInfo {
        CacheInfo {
            cache_key: "report:test".to_string(),
            ttl_seconds: 300,
            cache_hit: false,
        }
    }

    #[test]
    fn test_ninety_day_boundary() {
        let end = now();
        assert!(validate_time_range(end - Duration::days(90), end, end).is_ok());

        let err = validate_time_range(end - Duration::days(90) - Duration::seconds(1), end, end).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidTimeRange(_)));
    }

    #[test]
    fn test_inverted_and_future_ranges_rejected() {
        let end = now();
        assert!(matches!(
            validate_time_range(end, end, end),
            Err(AnalyticsError::InvalidTimeRange(_))
        ));
        assert!(matches!(
            validate_time_range(end - Duration::hours(1), end + Duration::hours(1), end),
            Err(AnalyticsError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn test_partition_strategy_by_length() {
        let end = now();

        let day = partition_plan(end - Duration::hours(24), end);
        assert_eq!(day.strategy, Granularity::Hourly);
        assert_eq!(day.partition_count, 24);
        assert_eq!(day.boundaries.len(), 25);

        let week = partition_plan(end - Duration::hours(100), end);
        assert_eq!(week.strategy, Granularity::Daily);
        assert_eq!(week.partition_count, 4);

        let month = partition_plan(end - Duration::days(30), end);
        assert_eq!(month.strategy, Granularity::Weekly);
        assert_eq!(month.partition_count, 4);
        assert_eq!(month.boundaries.len(), 5);
    }

    #[test]
    fn test_delivery_report() {
        let end = now();
        let start = end - Duration::hours(24);
        let metrics = vec![
            message_at(start + Duration::minutes(10), 100, 100),
            message_at(start + Duration::hours(1), 100, 90),
            message_at(start + Duration::hours(2), 300, 300),
        ];

        let report = ReportAssembler::default()
            .assemble(&request(start, end), ReportType::Delivery, &metrics, cache_info(), end)
            .unwrap();

        assert_eq!(report.buckets.len(), 24);
        assert_eq!(report.metadata.version, "1.0.0");
        assert_eq!(report.metadata.data_retention.retention_days, 90);

        let ReportKind::Delivery {
            weighted_delivery_rate,
            failure_analysis,
            trends,
            ..
        } = &report.statistics
        else {
            panic!("expected delivery body");
        };
        assert_eq!(*weighted_delivery_rate, 98.0);
        assert_eq!(failure_analysis.total_failures, 10);
        assert_eq!(failure_analysis.violation_periods.len(), 1);
        assert_eq!(failure_analysis.violation_periods[0].mean_delivery_rate, 90.0);
        assert_eq!(failure_analysis.status_breakdown.get("failed"), Some(&10));
        assert_eq!(trends.rolling_delivery_rate.len(), 3);
        assert!(trends.rolling_delivery_rate.iter().all(Option::is_none));
        assert_eq!(trends.hourly_pattern.trough_hour, Some(1));

        let sla = report.sla_compliance.unwrap();
        assert_eq!(sla.breach_count, 1);
    }

    #[test]
    fn test_empty_metrics_is_insufficient_data() {
        let end = now();
        let err = ReportAssembler::default()
            .assemble(&request(end - Duration::hours(2), end), ReportType::Delivery, &[], cache_info(), end)
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData(_)));
    }

    #[test]
    fn test_system_report_latency_trend() {
        let end = now();
        let start = end - Duration::hours(6);
        let metrics: Vec<Metric> = [1.8, 1.2, 0.9, 0.5]
            .iter()
            .enumerate()
            .map(|(i, rt)| {
                let mut metric = Metric::new(
                    "org-1234",
                    start + Duration::hours(i as i64),
                    MetricKind::System(SystemMetrics {
                        response_time: *rt,
                        cpu_usage: 40.0,
                        memory_usage: 50.0,
                        concurrent_users: 10,
                        error_counts: BTreeMap::new(),
                    }),
                );
                validate_metric(&mut metric, end);
                metric
            })
            .collect();

        let report = ReportAssembler::default()
            .assemble(&request(start, end), ReportType::System, &metrics, cache_info(), end)
            .unwrap();

        let ReportKind::System { response_time_direction, .. } = report.statistics else {
            panic!("expected system body");
        };
        assert_eq!(response_time_direction, TrendDirection::Improving);
        assert!(report.sla_compliance.unwrap().compliant);
    }

    #[test]
    fn test_report_json_round_trip() {
        let end = now();
        let start = end - Duration::hours(3);
        let metrics = vec![message_at(start, 50, 50), message_at(start + Duration::hours(1), 50, 49)];

        let report = ReportAssembler::default()
            .assemble(&request(start, end), ReportType::Delivery, &metrics, cache_info(), end)
            .unwrap();

        let json = serde_json::to_string(&report).unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.report_id, report.report_id);
        assert_eq!(parsed.summary.total_count, 2);
        assert_eq!(parsed.statistics, report.statistics);
        assert_eq!(parsed.sla_compliance, report.sla_compliance);

        let ReportKind::Delivery { weighted_delivery_rate, statistics, .. } = parsed.statistics else {
            panic!("expected delivery body");
        };
        assert_eq!(weighted_delivery_rate, 99.0);
        assert_eq!(statistics.sample_count, 2);
        assert_eq!(statistics.average_delivery_rate, 99.0);
        assert_eq!(statistics.sla_compliance.breach_count, 1);
    }

    #[test]
    fn test_irregular_statistics_survive_json_exactly() {
        let end = now();
        let start = end - Duration::hours(3);
        let metrics: Vec<Metric> = (0..37)
            .map(|i| message_at(start + Duration::minutes(4 * i), 997 + i * 13, 961 + (i * 7) % 31))
            .collect();

        let report = ReportAssembler::default()
            .assemble(&request(start, end), ReportType::Delivery, &metrics, cache_info(), end)
            .unwrap();
        let ReportKind::Delivery { statistics, .. } = &report.statistics else {
            panic!("expected delivery body");
        };
        assert_eq!(statistics.sample_count, 37);
        assert!(statistics.rate_summary.confidence_interval.is_some());

        let parsed: Report = serde_json::from_str(&serde_json::to_string(&report).unwrap()).unwrap();
        assert_eq!(parsed.statistics, report.statistics);
        assert_eq!(parsed.sla_compliance, report.sla_compliance);
    }
}
