//! Metric validation and derived-rate computation.
//!
//! Validation never raises: every check appends a message to the metric's
//! error list, and `is_valid` reflects whether the list stayed empty.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{EngagementMetrics, MessageMetrics, Metric, MetricKind, SystemMetrics};

pub const DELIVERY_SLA_TARGET: f64 = 99.0;

/// Mean session length (seconds) at which the duration factor saturates
const SESSION_SATURATION_SECS: f64 = 300.0;

static ORGANIZATION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9-]{4,}$").expect("valid organization id pattern"));

pub fn is_valid_organization_id(organization_id: &str) -> bool {
    ORGANIZATION_ID.is_match(organization_id)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `delivered / total * 100`, rounded to 2 decimals; 0 when nothing was sent.
pub fn delivery_rate(total: i64, delivered: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(delivered as f64 / total as f64 * 100.0)
}

/// Weighted interactions per user scaled by how close mean session length
/// gets to five minutes.
pub fn engagement_rate(metrics: &EngagementMetrics) -> f64 {
    if metrics.unique_users <= 0 {
        return 0.0;
    }

    let weighted: f64 = metrics
        .interaction_types
        .iter()
        .map(|(kind, count)| {
            let weight = metrics.interaction_weights.get(kind).copied().unwrap_or(1.0);
            *count as f64 * weight
        })
        .sum();

    let duration_factor = if metrics.session_durations.is_empty() {
        0.0
    } else {
        let mean = metrics.session_durations.iter().sum::<f64>() / metrics.session_durations.len() as f64;
        (mean / SESSION_SATURATION_SECS).min(1.0)
    };

    round2(weighted / metrics.unique_users as f64 * duration_factor * 100.0)
}

fn check_message(m: &mut MessageMetrics, errors: &mut Vec<String>) {
    if m.total_messages < 0 || m.delivered_messages < 0 || m.failed_messages < 0 {
        errors.push("Message counts cannot be negative".to_string());
    }
    // Widened so counts near i64::MAX cannot wrap past the check
    if (m.total_messages as i128) < m.delivered_messages as i128 + m.failed_messages as i128 {
        errors.push("Total messages must be at least delivered plus failed".to_string());
    }
    if m.status_breakdown.values().any(|count| *count < 0) {
        errors.push("Status breakdown counts cannot be negative".to_string());
    }
    m.delivery_rate = delivery_rate(m.total_messages, m.delivered_messages);
}

fn check_engagement(e: &mut EngagementMetrics, errors: &mut Vec<String>) {
    if e.total_interactions < 0 || e.unique_users < 0 {
        errors.push("Engagement counts cannot be negative".to_string());
    }
    if e.interaction_types.values().any(|count| *count < 0) {
        errors.push("Interaction counts cannot be negative".to_string());
    }
    if e.session_durations.iter().any(|d| !d.is_finite() || *d < 0.0) {
        errors.push("Session durations must be non-negative".to_string());
    }
    if e.interaction_weights.values().any(|w| !w.is_finite()) {
        errors.push("Interaction weights must be finite".to_string());
    }
    let rate = engagement_rate(e);
    e.engagement_rate = if rate.is_finite() { rate } else { 0.0 };
}

fn check_system(s: &SystemMetrics, errors: &mut Vec<String>) {
    if !s.response_time.is_finite() || s.response_time < 0.0 {
        errors.push("Response time must be non-negative".to_string());
    }
    if !(0.0..=100.0).contains(&s.cpu_usage) {
        errors.push("CPU usage must be between 0 and 100".to_string());
    }
    if !(0.0..=100.0).contains(&s.memory_usage) {
        errors.push("Memory usage must be between 0 and 100".to_string());
    }
    if s.concurrent_users < 0 {
        errors.push("Concurrent users cannot be negative".to_string());
    }
    if s.error_counts.values().any(|count| *count < 0) {
        errors.push("Error counts cannot be negative".to_string());
    }
}

/// Validates `metric` against `now`, recomputes derived rates and records
/// the outcome on the metric. Returns the error list.
pub fn validate_metric(metric: &mut Metric, now: DateTime<Utc>) -> Vec<String> {
    let mut errors = Vec::new();

    if !is_valid_organization_id(&metric.organization_id) {
        errors.push("Invalid organization_id format".to_string());
    }
    if metric.timestamp > now {
        errors.push("Timestamp cannot be in the future".to_string());
    }

    match &mut metric.kind {
        MetricKind::Message(m) => {
            check_message(m, &mut errors);
            // SLA misses are recorded, never rejected
            metric
                .metadata
                .insert("sla_compliant".to_string(), Value::Bool(m.delivery_rate >= DELIVERY_SLA_TARGET));
        }
        MetricKind::Engagement(e) => check_engagement(e, &mut errors),
        MetricKind::System(s) => {
            check_system(s, &mut errors);
            if errors.is_empty() {
                let health = health_check(s);
                metric
                    .metadata
                    .insert("health_score".to_string(), serde_json::json!(health.score));
                metric
                    .metadata
                    .insert("health_status".to_string(), serde_json::json!(health.status));
            }
        }
    }

    metric.is_valid = errors.is_empty();
    metric.validation_errors = errors.clone();
    errors
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RejectedMetric {
    pub index: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct BatchValidation {
    pub accepted: Vec<Metric>,
    pub rejected: Vec<RejectedMetric>,
}

/// Splits a batch into valid metrics and per-index rejection reasons.
pub fn validate_batch(metrics: Vec<Metric>, now: DateTime<Utc>) -> BatchValidation {
    let mut result = BatchValidation::default();

    for (index, mut metric) in metrics.into_iter().enumerate() {
        let errors = validate_metric(&mut metric, now);
        if errors.is_empty() {
            result.accepted.push(metric);
        } else {
            result.rejected.push(RejectedMetric { index, errors });
        }
    }

    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthCheck {
    pub score: f64,
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

/// Scores a system sample out of 100; 80 and above is healthy.
pub fn health_check(metrics: &SystemMetrics) -> HealthCheck {
    let mut score = 100.0;
    let mut issues = Vec::new();

    if metrics.response_time > 2.0 {
        score -= (metrics.response_time - 2.0) * 10.0;
        issues.push(format!("Response time {:.2}s exceeds 2.0s", metrics.response_time));
    }
    if metrics.concurrent_users > 1000 {
        score -= (metrics.concurrent_users - 1000) as f64 * 0.1;
        issues.push(format!("Concurrent users {} exceed 1000", metrics.concurrent_users));
    }
    if metrics.cpu_usage > 80.0 {
        score -= (metrics.cpu_usage - 80.0) * 0.5;
        issues.push(format!("CPU usage {:.1}% above 80%", metrics.cpu_usage));
    }
    if metrics.memory_usage > 80.0 {
        score -= (metrics.memory_usage - 80.0) * 0.5;
        issues.push(format!("Memory usage {:.1}% above 80%", metrics.memory_usage));
    }

    let score = round2(score.clamp(0.0, 100.0));
    let status = if score >= 80.0 { HealthStatus::Healthy } else { HealthStatus::Warning };

    HealthCheck { score, status, issues }
}
