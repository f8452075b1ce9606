use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use courier_database::models::MetricRow;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::{AnalyticsError, AnalyticsResult};

/// Which family of observation a metric belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Message,
    Engagement,
    System,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Message => "message",
            MetricType::Engagement => "engagement",
            MetricType::System => "system",
        }
    }

    /// Fields aggregated per time bucket, primary field first
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            MetricType::Message => &[
                "delivery_rate",
                "total_messages",
                "delivered_messages",
                "failed_messages",
            ],
            MetricType::Engagement => &["engagement_rate", "total_interactions", "unique_users"],
            MetricType::System => &["response_time", "cpu_usage", "memory_usage", "concurrent_users"],
        }
    }

    pub fn primary_field(&self) -> &'static str {
        self.fields()[0]
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetrics {
    pub total_messages: i64,
    pub delivered_messages: i64,
    pub failed_messages: i64,
    #[serde(default)]
    pub delivery_rate: f64,
    #[serde(default)]
    pub status_breakdown: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub total_interactions: i64,
    pub unique_users: i64,
    #[serde(default)]
    pub interaction_types: BTreeMap<String, i64>,
    #[serde(default)]
    pub interaction_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub session_durations: Vec<f64>,
    #[serde(default)]
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Seconds
    pub response_time: f64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub concurrent_users: i64,
    #[serde(default)]
    pub error_counts: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MetricKind {
    Message(MessageMetrics),
    Engagement(EngagementMetrics),
    System(SystemMetrics),
}

impl MetricKind {
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricKind::Message(_) => MetricType::Message,
            MetricKind::Engagement(_) => MetricType::Engagement,
            MetricKind::System(_) => MetricType::System,
        }
    }

    /// Value of an aggregatable field, in the order of `MetricType::fields`
    pub fn field_value(&self, field: &str) -> Option<f64> {
        match self {
            MetricKind::Message(m) => match field {
                "delivery_rate" => Some(m.delivery_rate),
                "total_messages" => Some(m.total_messages as f64),
                "delivered_messages" => Some(m.delivered_messages as f64),
                "failed_messages" => Some(m.failed_messages as f64),
                _ => None,
            },
            MetricKind::Engagement(e) => match field {
                "engagement_rate" => Some(e.engagement_rate),
                "total_interactions" => Some(e.total_interactions as f64),
                "unique_users" => Some(e.unique_users as f64),
                _ => None,
            },
            MetricKind::System(s) => match field {
                "response_time" => Some(s.response_time),
                "cpu_usage" => Some(s.cpu_usage),
                "memory_usage" => Some(s.memory_usage),
                "concurrent_users" => Some(s.concurrent_users as f64),
                _ => None,
            },
        }
    }

    pub fn primary_value(&self) -> f64 {
        self.field_value(self.metric_type().primary_field())
            .unwrap_or_default()
    }
}

/// One observation event, immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: Uuid,
    pub organization_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: MetricKind,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub validation_errors: Vec<String>,
}

impl Metric {
    pub fn new(organization_id: impl Into<String>, timestamp: DateTime<Utc>, kind: MetricKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id: organization_id.into(),
            timestamp,
            kind,
            metadata: Map::new(),
            is_valid: false,
            validation_errors: Vec::new(),
        }
    }

    pub fn metric_type(&self) -> MetricType {
        self.kind.metric_type()
    }

    pub fn as_message(&self) -> Option<&MessageMetrics> {
        match &self.kind {
            MetricKind::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_engagement(&self) -> Option<&EngagementMetrics> {
        match &self.kind {
            MetricKind::Engagement(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_system(&self) -> Option<&SystemMetrics> {
        match &self.kind {
            MetricKind::System(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_row(&self) -> AnalyticsResult<MetricRow> {
        Ok(MetricRow {
            id: self.id,
            organization_id: self.organization_id.clone(),
            kind: self.metric_type().as_str().to_string(),
            timestamp: self.timestamp,
            payload: serde_json::to_value(&self.kind)?,
            metadata: Value::Object(self.metadata.clone()),
            is_valid: self.is_valid,
            validation_errors: self.validation_errors.clone(),
            created_at: Utc::now(),
        })
    }

    pub fn from_row(row: MetricRow) -> AnalyticsResult<Self> {
        let kind: MetricKind = serde_json::from_value(row.payload).map_err(|e| {
            AnalyticsError::Internal(format!("Corrupt metric payload {}: {}", row.id, e))
        })?;

        let metadata = match row.metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Ok(Self {
            id: row.id,
            organization_id: row.organization_id,
            timestamp: row.timestamp,
            kind,
            metadata,
            is_valid: row.is_valid,
            validation_errors: row.validation_errors,
        })
    }
}

/// Metric as submitted to the ingestion endpoint. Derived rates are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricInput {
    pub organization_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: MetricKind,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl From<MetricInput> for Metric {
    fn from(input: MetricInput) -> Self {
        let mut metric = Metric::new(input.organization_id, input.timestamp, input.kind);
        metric.metadata = input.metadata;
        metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_uses_kind_tag() {
        let input: MetricInput = serde_json::from_value(json!({
            "organization_id": "org-1234",
            "timestamp": "2024-01-01T00:00:00Z",
            "kind": "system",
            "response_time": 1,
            "cpu_usage": 40.5,
            "memory_usage": 60,
            "concurrent_users": 10
        }))
        .unwrap();

        let metric = Metric::from(input);
        assert_eq!(metric.metric_type(), MetricType::System);
        assert_eq!(metric.kind.field_value("response_time"), Some(1.0));
        assert!(!metric.is_valid);
    }

    #[test]
    fn test_row_conversion_keeps_payload() {
        let mut metric = Metric::new(
            "org-1234",
            Utc::now(),
            MetricKind::Message(MessageMetrics {
                total_messages: 10,
                delivered_messages: 9,
                failed_messages: 1,
                delivery_rate: 90.0,
                status_breakdown: BTreeMap::from([("bounced".to_string(), 1)]),
            }),
        );
        metric.is_valid = true;

        let row = metric.to_row().unwrap();
        assert_eq!(row.kind, "message");
        assert_eq!(row.payload["kind"], "message");

        let back = Metric::from_row(row).unwrap();
        assert_eq!(back.kind, metric.kind);
        assert!(back.is_valid);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<MetricInput, _> = serde_json::from_value(json!({
            "organization_id": "org-1234",
            "timestamp": "2024-01-01T00:00:00Z",
            "kind": "weather"
        }));
        assert!(result.is_err());
    }
}
