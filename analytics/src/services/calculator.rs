//! Descriptive statistics over metric samples.
//!
//! All functions are synchronous and never suspend; callers hand in slices
//! of already-loaded observations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{AnalyticsError, AnalyticsResult};
use crate::models::{Metric, MetricType};
use crate::services::validators::{health_check, round2, HealthStatus, DELIVERY_SLA_TARGET};

pub const RESPONSE_TIME_SLA_SECS: f64 = 2.0;
pub const DELIVERY_THRESHOLD_TIERS: [f64; 3] = [99.0, 97.0, 95.0];
pub const RESOURCE_USAGE_LIMIT: f64 = 80.0;
pub const TREND_WINDOW: usize = 24;

/// Correlation magnitude below which a series counts as flat
const TREND_CORRELATION_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatisticsConfig {
    pub percentiles: Vec<f64>,
    pub confidence_z: f64,
    pub min_sample_for_ci: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            percentiles: vec![25.0, 50.0, 75.0, 90.0, 95.0, 99.0],
            confidence_z: 1.96,
            min_sample_for_ci: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatisticalSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: BTreeMap<String, f64>,
    pub confidence_interval: Option<ConfidenceInterval>,
}

pub fn percentile_key(p: f64) -> String {
    format!("p{}", p)
}

fn ensure_usable(values: &[f64]) -> AnalyticsResult<()> {
    if values.is_empty() {
        return Err(AnalyticsError::InsufficientData(
            "No observations available for statistics".to_string(),
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AnalyticsError::Validation(
            "Observations must be finite numbers".to_string(),
        ));
    }
    Ok(())
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Linear interpolation between closest ranks, rank = p/100 * (n - 1).
/// `sorted` must be non-empty and ascending.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Running mean; each step moves by a bounded amount so finite inputs
/// never overflow.
pub fn mean(values: &[f64]) -> f64 {
    let mut avg = 0.0;
    for (i, value) in values.iter().enumerate() {
        let k = (i + 1) as f64;
        avg += value / k - avg / k;
    }
    avg
}

/// Sum of counts that pins at `i64::MAX` instead of wrapping
fn total_count(counts: impl Iterator<Item = i64>) -> i64 {
    counts.fold(0, i64::saturating_add)
}

/// Population standard deviation (divides by n)
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn summarize(values: &[f64], config: &StatisticsConfig) -> AnalyticsResult<StatisticalSummary> {
    ensure_usable(values)?;

    let sorted = sorted_copy(values);
    let count = sorted.len();
    // Rounding can push the mean a ULP past the extremes
    let avg = mean(&sorted).clamp(sorted[0], sorted[count - 1]);
    let std = std_dev(&sorted);

    let percentiles = config
        .percentiles
        .iter()
        .map(|p| (percentile_key(*p), percentile(&sorted, *p)))
        .collect();

    let confidence_interval = (count >= config.min_sample_for_ci).then(|| {
        let margin = config.confidence_z * std / (count as f64).sqrt();
        ConfidenceInterval {
            lower: avg - margin,
            upper: avg + margin,
            confidence_level: 0.95,
        }
    });

    Ok(StatisticalSummary {
        count,
        mean: avg,
        median: percentile(&sorted, 50.0),
        std_dev: std,
        min: sorted[0],
        max: sorted[count - 1],
        percentiles,
        confidence_interval,
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlaComparison {
    /// Value must be at or above the target
    AtLeast,
    /// Value must be strictly below the target
    Below,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SlaThreshold {
    pub target: f64,
    pub comparison: SlaComparison,
}

impl SlaThreshold {
    pub const DELIVERY_RATE: SlaThreshold = SlaThreshold {
        target: DELIVERY_SLA_TARGET,
        comparison: SlaComparison::AtLeast,
    };

    pub const RESPONSE_TIME: SlaThreshold = SlaThreshold {
        target: RESPONSE_TIME_SLA_SECS,
        comparison: SlaComparison::Below,
    };

    /// SLA applied to the primary field of a metric family, if any
    pub fn for_metric_type(metric_type: MetricType) -> Option<SlaThreshold> {
        match metric_type {
            MetricType::Message => Some(Self::DELIVERY_RATE),
            MetricType::System => Some(Self::RESPONSE_TIME),
            MetricType::Engagement => None,
        }
    }

    pub fn meets(&self, value: f64) -> bool {
        match self.comparison {
            SlaComparison::AtLeast => value >= self.target,
            SlaComparison::Below => value < self.target,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlaCompliance {
    pub threshold: f64,
    pub comparison: SlaComparison,
    /// Whether the mean meets the threshold
    pub compliant: bool,
    /// Fraction of observations meeting the threshold
    pub compliance_ratio: f64,
    pub breach_count: usize,
}

pub fn sla_compliance(values: &[f64], threshold: SlaThreshold) -> AnalyticsResult<SlaCompliance> {
    ensure_usable(values)?;

    let passing = values.iter().filter(|v| threshold.meets(**v)).count();

    Ok(SlaCompliance {
        threshold: threshold.target,
        comparison: threshold.comparison,
        compliant: threshold.meets(mean(values)),
        compliance_ratio: passing as f64 / values.len() as f64,
        breach_count: values.len() - passing,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierBreach {
    pub threshold: f64,
    /// Fraction of values below the tier
    pub breach_ratio: f64,
    /// Smallest `value - tier`; negative when any value falls short
    pub margin: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdAnalysis {
    pub tiers: Vec<TierBreach>,
    /// Fraction of values below the lowest tier
    pub critical_breach_ratio: f64,
}

pub fn threshold_analysis(values: &[f64], tiers: &[f64]) -> AnalyticsResult<ThresholdAnalysis> {
    ensure_usable(values)?;

    let n = values.len() as f64;
    let min_value = values.iter().copied().fold(f64::INFINITY, f64::min);

    let tiers_out = tiers
        .iter()
        .map(|tier| TierBreach {
            threshold: *tier,
            breach_ratio: values.iter().filter(|v| **v < *tier).count() as f64 / n,
            margin: round2(min_value - tier),
        })
        .collect();

    let critical_breach_ratio = match tiers.iter().copied().reduce(f64::min) {
        Some(lowest) => values.iter().filter(|v| **v < lowest).count() as f64 / n,
        None => 0.0,
    };

    Ok(ThresholdAnalysis {
        tiers: tiers_out,
        critical_breach_ratio,
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

/// Pearson correlation between sample index and value
pub fn index_correlation(series: &[f64]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }

    let n = series.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = mean(series);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (i, y) in series.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_y == 0.0 {
        return Some(0.0);
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

pub fn trend_direction(series: &[f64]) -> TrendDirection {
    match index_correlation(series) {
        None => TrendDirection::InsufficientData,
        Some(r) if r > TREND_CORRELATION_THRESHOLD => TrendDirection::Improving,
        Some(r) if r < -TREND_CORRELATION_THRESHOLD => TrendDirection::Declining,
        Some(_) => TrendDirection::Stable,
    }
}

/// Trailing means; the first `window - 1` positions have no full window.
pub fn rolling_mean(series: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; series.len()];
    }

    let mut out = Vec::with_capacity(series.len());
    let mut running = 0.0;
    for (i, value) in series.iter().enumerate() {
        running += value;
        if i >= window {
            running -= series[i - window];
        }
        out.push((i + 1 >= window).then(|| round2(running / window as f64)));
    }
    out
}

// ============================================================================
// Domain statistics
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryStatistics {
    pub sample_count: usize,
    pub total_messages: i64,
    pub delivered_messages: i64,
    pub failed_messages: i64,
    pub average_delivery_rate: f64,
    pub std_dev: f64,
    pub rate_summary: StatisticalSummary,
    pub sla_compliance: SlaCompliance,
    pub threshold_analysis: ThresholdAnalysis,
}

pub fn delivery_statistics(
    metrics: &[Metric],
    config: &StatisticsConfig,
) -> AnalyticsResult<DeliveryStatistics> {
    let messages: Vec<_> = metrics
        .iter()
        .filter(|m| m.is_valid)
        .filter_map(Metric::as_message)
        .collect();

    if messages.is_empty() {
        return Err(AnalyticsError::InsufficientData(
            "No valid message metrics in range".to_string(),
        ));
    }

    let rates: Vec<f64> = messages.iter().map(|m| m.delivery_rate).collect();
    let rate_summary = summarize(&rates, config)?;

    Ok(DeliveryStatistics {
        sample_count: messages.len(),
        total_messages: total_count(messages.iter().map(|m| m.total_messages)),
        delivered_messages: total_count(messages.iter().map(|m| m.delivered_messages)),
        failed_messages: total_count(messages.iter().map(|m| m.failed_messages)),
        average_delivery_rate: round2(rate_summary.mean),
        std_dev: rate_summary.std_dev,
        sla_compliance: sla_compliance(&rates, SlaThreshold::DELIVERY_RATE)?,
        threshold_analysis: threshold_analysis(&rates, &DELIVERY_THRESHOLD_TIERS)?,
        rate_summary,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngagementStatistics {
    pub sample_count: usize,
    pub average_engagement_rate: f64,
    pub peak_engagement_rate: f64,
    /// Standard deviation of the engagement rate
    pub volatility: f64,
    pub total_interactions: i64,
    pub unique_users: i64,
    pub interaction_totals: BTreeMap<String, i64>,
    pub rate_summary: StatisticalSummary,
}

pub fn engagement_statistics(
    metrics: &[Metric],
    config: &StatisticsConfig,
) -> AnalyticsResult<EngagementStatistics> {
    let samples: Vec<_> = metrics
        .iter()
        .filter(|m| m.is_valid)
        .filter_map(Metric::as_engagement)
        .collect();

    if samples.is_empty() {
        return Err(AnalyticsError::InsufficientData(
            "No valid engagement metrics in range".to_string(),
        ));
    }

    let rates: Vec<f64> = samples.iter().map(|e| e.engagement_rate).collect();
    let rate_summary = summarize(&rates, config)?;

    let mut interaction_totals = BTreeMap::new();
    for sample in &samples {
        for (kind, count) in &sample.interaction_types {
            let total = interaction_totals.entry(kind.clone()).or_insert(0i64);
            *total = total.saturating_add(*count);
        }
    }

    Ok(EngagementStatistics {
        sample_count: samples.len(),
        average_engagement_rate: round2(rate_summary.mean),
        peak_engagement_rate: rate_summary.max,
        volatility: rate_summary.std_dev,
        total_interactions: total_count(samples.iter().map(|e| e.total_interactions)),
        unique_users: total_count(samples.iter().map(|e| e.unique_users)),
        interaction_totals,
        rate_summary,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceUsage {
    pub average: f64,
    pub peak: f64,
}

impl ResourceUsage {
    fn from_values(values: &[f64]) -> Self {
        Self {
            average: round2(mean(values)),
            peak: values.iter().copied().fold(0.0, f64::max),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSummary {
    pub healthy_count: usize,
    pub healthy_ratio: f64,
    pub average_score: f64,
    pub overall_status: HealthStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceStatistics {
    pub sample_count: usize,
    pub average_response_time: f64,
    pub p95_response_time: f64,
    pub response_time: StatisticalSummary,
    pub response_time_sla: SlaCompliance,
    pub cpu_usage: ResourceUsage,
    pub memory_usage: ResourceUsage,
    pub peak_concurrent_users: i64,
    pub error_totals: BTreeMap<String, i64>,
    pub health: HealthSummary,
}

pub fn performance_statistics(
    metrics: &[Metric],
    config: &StatisticsConfig,
) -> AnalyticsResult<PerformanceStatistics> {
    let samples: Vec<_> = metrics
        .iter()
        .filter(|m| m.is_valid)
        .filter_map(Metric::as_system)
        .collect();

    if samples.is_empty() {
        return Err(AnalyticsError::InsufficientData(
            "No valid system metrics in range".to_string(),
        ));
    }

    let response_times: Vec<f64> = samples.iter().map(|s| s.response_time).collect();
    let cpu: Vec<f64> = samples.iter().map(|s| s.cpu_usage).collect();
    let memory: Vec<f64> = samples.iter().map(|s| s.memory_usage).collect();

    let response_time = summarize(&response_times, config)?;
    let sorted = sorted_copy(&response_times);

    let checks: Vec<_> = samples.iter().map(|s| health_check(s)).collect();
    let healthy_count = checks
        .iter()
        .filter(|c| c.status == HealthStatus::Healthy)
        .count();
    let scores: Vec<f64> = checks.iter().map(|c| c.score).collect();

    let mut error_totals = BTreeMap::new();
    for sample in &samples {
        for (kind, count) in &sample.error_counts {
            let total = error_totals.entry(kind.clone()).or_insert(0i64);
            *total = total.saturating_add(*count);
        }
    }

    Ok(PerformanceStatistics {
        sample_count: samples.len(),
        average_response_time: round2(response_time.mean),
        p95_response_time: percentile(&sorted, 95.0),
        response_time_sla: sla_compliance(&response_times, SlaThreshold::RESPONSE_TIME)?,
        response_time,
        cpu_usage: ResourceUsage::from_values(&cpu),
        memory_usage: ResourceUsage::from_values(&memory),
        peak_concurrent_users: samples.iter().map(|s| s.concurrent_users).max().unwrap_or(0),
        error_totals,
        health: HealthSummary {
            healthy_count,
            healthy_ratio: healthy_count as f64 / samples.len() as f64,
            average_score: round2(mean(&scores)),
            overall_status: if healthy_count == samples.len() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Warning
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageMetrics, MetricKind, SystemMetrics};
    use chrono::Utc;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn valid_message(total: i64, delivered: i64) -> Metric {
        let mut metric = Metric::new(
            "org-1234",
            Utc::now(),
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
    fn test_summary_basics() {
        let summary = summarize(&[1.0, 2.0, 3.0, 4.0], &StatisticsConfig::default()).unwrap();

        assert_eq!(summary.count, 4);
        assert!(approx(summary.mean, 2.5));
        assert!(approx(summary.median, 2.5));
        assert!(approx(summary.std_dev, 1.25f64.sqrt()));
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
        assert!(approx(summary.percentiles["p25"], 1.75));
        assert!(approx(summary.percentiles["p90"], 3.7));
        assert!(summary.confidence_interval.is_none());
    }

    #[test]
    fn test_mean_within_bounds() {
        let samples = [
            vec![5.0],
            vec![-3.0, 7.5, 0.25],
            vec![1e6, 1e-6, 42.0, 42.0, 17.0],
            vec![f64::MAX, f64::MAX],
            vec![f64::MAX, f64::MAX / 2.0, f64::MAX],
        ];
        let repeated = (2..40).map(|n| vec![0.1; n]);
        for values in samples.into_iter().chain(repeated) {
            let summary = summarize(&values, &StatisticsConfig::default()).unwrap();
            assert!(summary.mean.is_finite(), "mean of {:?} is {}", values, summary.mean);
            assert!(
                summary.min <= summary.mean && summary.mean <= summary.max,
                "mean {} outside [{}, {}]",
                summary.mean,
                summary.min,
                summary.max
            );
        }
    }

    #[test]
    fn test_constant_samples_average_to_themselves() {
        for n in 1..40 {
            assert_eq!(mean(&vec![0.1; n]), 0.1);
        }
        assert_eq!(mean(&[f64::MAX, f64::MAX]), f64::MAX);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_count_totals_saturate() {
        let metrics = vec![valid_message(i64::MAX, i64::MAX), valid_message(100, 100)];
        let stats = delivery_statistics(&metrics, &StatisticsConfig::default()).unwrap();
        assert_eq!(stats.total_messages, i64::MAX);
        assert_eq!(stats.delivered_messages, i64::MAX);
        assert_eq!(stats.failed_messages, 0);
    }

    #[test]
    fn test_single_value() {
        let summary = summarize(&[7.0], &StatisticsConfig::default()).unwrap();
        assert_eq!(summary.std_dev, 0.0);
        assert!(summary.percentiles.values().all(|p| *p == 7.0));
    }

    #[test]
    fn test_empty_and_non_finite_inputs() {
        let config = StatisticsConfig::default();
        assert!(matches!(summarize(&[], &config), Err(AnalyticsError::InsufficientData(_))));
        assert!(matches!(
            summarize(&[1.0, f64::NAN], &config),
            Err(AnalyticsError::Validation(_))
        ));
    }

    #[test]
    fn test_confidence_interval_from_thirty_samples() {
        let values: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let summary = summarize(&values, &StatisticsConfig::default()).unwrap();
        let ci = summary.confidence_interval.unwrap();

        let margin = 1.96 * summary.std_dev / 30f64.sqrt();
        assert!(approx(ci.lower, summary.mean - margin));
        assert!(approx(ci.upper, summary.mean + margin));
        assert_eq!(ci.confidence_level, 0.95);
    }

    #[test]
    fn test_sla_ratios() {
        let passing = sla_compliance(&[99.5, 100.0, 99.0], SlaThreshold::DELIVERY_RATE).unwrap();
        assert_eq!(passing.compliance_ratio, 1.0);
        assert!(passing.compliant);

        let failing = sla_compliance(&[2.5, 3.0], SlaThreshold::RESPONSE_TIME).unwrap();
        assert_eq!(failing.compliance_ratio, 0.0);
        assert_eq!(failing.breach_count, 2);
        assert!(!failing.compliant);

        // strict comparison for "below"
        assert!(!SlaThreshold::RESPONSE_TIME.meets(2.0));
    }

    #[test]
    fn test_threshold_tiers() {
        let analysis = threshold_analysis(&[100.0, 98.0, 96.0, 90.0], &DELIVERY_THRESHOLD_TIERS).unwrap();

        assert_eq!(analysis.tiers[0].breach_ratio, 0.75);
        assert_eq!(analysis.tiers[1].breach_ratio, 0.5);
        assert_eq!(analysis.tiers[2].breach_ratio, 0.25);
        assert_eq!(analysis.tiers[0].margin, -9.0);
        assert_eq!(analysis.critical_breach_ratio, 0.25);
    }

    #[test]
    fn test_trend_direction() {
        assert_eq!(trend_direction(&[1.0, 2.0, 3.0]), TrendDirection::Improving);
        assert_eq!(trend_direction(&[3.0, 2.0, 1.0]), TrendDirection::Declining);
        assert_eq!(trend_direction(&[5.0, 5.0, 5.0]), TrendDirection::Stable);
        assert_eq!(trend_direction(&[5.0]), TrendDirection::InsufficientData);
    }

    #[test]
    fn test_rolling_mean() {
        let rolled = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(rolled, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
        assert!(rolling_mean(&[1.0], 24).iter().all(Option::is_none));
    }

    #[test]
    fn test_delivery_statistics_ignores_invalid() {
        let mut invalid = valid_message(10, 0);
        invalid.is_valid = false;
        let metrics = vec![valid_message(100, 100), valid_message(100, 98), invalid];

        let stats = delivery_statistics(&metrics, &StatisticsConfig::default()).unwrap();
        assert_eq!(stats.sample_count, 2);
        assert_eq!(stats.total_messages, 200);
        assert_eq!(stats.average_delivery_rate, 99.0);
        assert_eq!(stats.sla_compliance.breach_count, 1);
    }

    #[test]
    fn test_delivery_statistics_requires_data() {
        let result = delivery_statistics(&[], &StatisticsConfig::default());
        assert!(matches!(result, Err(AnalyticsError::InsufficientData(_))));
    }

    #[test]
    fn test_performance_health_summary() {
        let mut fast = Metric::new(
            "org-1234",
            Utc::now(),
            MetricKind::System(SystemMetrics {
                response_time: 0.5,
                cpu_usage: 40.0,
                memory_usage: 50.0,
                concurrent_users: 200,
                error_counts: BTreeMap::from([("timeout".to_string(), 2)]),
            }),
        );
        fast.is_valid = true;
        let mut slow = fast.clone();
        if let MetricKind::System(s) = &mut slow.kind {
            s.response_time = 5.0;
            s.cpu_usage = 95.0;
        }

        let stats = performance_statistics(&[fast, slow], &StatisticsConfig::default()).unwrap();
        assert_eq!(stats.health.healthy_count, 1);
        assert_eq!(stats.health.overall_status, HealthStatus::Warning);
        assert_eq!(stats.cpu_usage.peak, 95.0);
        assert_eq!(stats.error_totals["timeout"], 4);
        assert_eq!(stats.response_time_sla.compliance_ratio, 0.5);
    }
}
