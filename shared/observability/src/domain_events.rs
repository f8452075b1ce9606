//! Domain event logging for Courier services.
//!
//! Structured `domain_event` log lines for report generation, metric
//! ingestion, dashboard SLA breaches and contact imports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a domain operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult {
    Success,
    Failure,
    Partial,
    Skipped,
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Partial => write!(f, "partial"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Categories of domain events for filtering
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Metrics,
    Reports,
    Dashboard,
    Cache,
    Contacts,
    Groups,
    Import,
    System,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Metrics => "metrics",
            Self::Reports => "reports",
            Self::Dashboard => "dashboard",
            Self::Cache => "cache",
            Self::Contacts => "contacts",
            Self::Groups => "groups",
            Self::Import => "import",
            Self::System => "system",
        };
        f.write_str(name)
    }
}

/// A structured domain event for logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub timestamp: DateTime<Utc>,
    pub category: EventCategory,
    /// Specific event type (e.g., "report_generated", "import_completed")
    pub event_type: String,
    /// Entity type being operated on (e.g., "report", "contact")
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub result: OperationResult,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub organization_id: Option<String>,
    /// Service that emitted the event
    pub service: String,
    pub metadata: Option<serde_json::Value>,
}

impl DomainEvent {
    /// Create a new domain event builder
    pub fn new(
        service: impl Into<String>,
        category: EventCategory,
        event_type: impl Into<String>,
    ) -> DomainEventBuilder {
        DomainEventBuilder {
            service: service.into(),
            category,
            event_type: event_type.into(),
            entity_type: None,
            entity_id: None,
            result: OperationResult::Success,
            duration_ms: None,
            error: None,
            organization_id: None,
            metadata: None,
        }
    }
}

/// Builder for constructing domain events
pub struct DomainEventBuilder {
    service: String,
    category: EventCategory,
    event_type: String,
    entity_type: Option<String>,
    entity_id: Option<String>,
    result: OperationResult,
    duration_ms: Option<u64>,
    error: Option<String>,
    organization_id: Option<String>,
    metadata: Option<serde_json::Value>,
}

impl DomainEventBuilder {
    pub fn entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn result(mut self, result: OperationResult) -> Self {
        self.result = result;
        self
    }

    pub fn success(mut self) -> Self {
        self.result = OperationResult::Success;
        self
    }

    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.result = OperationResult::Failure;
        self.error = Some(error.into());
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Build and emit the event as a log
    pub fn emit(self) {
        let event = self.build();
        let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());

        match event.result {
            OperationResult::Success => tracing::info!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                result = "success",
                "DomainEvent: {}", json
            ),
            OperationResult::Failure => tracing::error!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                result = "failure",
                error = ?event.error,
                "DomainEvent: {}", json
            ),
            OperationResult::Partial => tracing::warn!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                result = "partial",
                "DomainEvent: {}", json
            ),
            OperationResult::Skipped => tracing::debug!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                result = "skipped",
                "DomainEvent: {}", json
            ),
        }
    }

    /// Build the event without emitting
    pub fn build(self) -> DomainEvent {
        DomainEvent {
            timestamp: Utc::now(),
            category: self.category,
            event_type: self.event_type,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            result: self.result,
            duration_ms: self.duration_ms,
            error: self.error,
            organization_id: self.organization_id,
            service: self.service,
            metadata: self.metadata,
        }
    }
}

// ============================================================================
// Convenience functions for common domain events
// ============================================================================

/// Log a generated (or cache-served) report
pub fn log_report_generated(
    service: &str,
    organization_id: &str,
    report_id: &str,
    report_type: &str,
    cache_hit: bool,
    duration_ms: u64,
) {
    DomainEvent::new(service, EventCategory::Reports, "report_generated")
        .entity("report", report_id)
        .organization(organization_id)
        .duration_ms(duration_ms)
        .metadata(serde_json::json!({ "report_type": report_type, "cache_hit": cache_hit }))
        .success()
        .emit();
}

/// Log metric ingestion outcome
pub fn log_metrics_ingested(service: &str, accepted: usize, rejected: usize, duration_ms: u64) {
    let result = match (accepted, rejected) {
        (_, 0) => OperationResult::Success,
        (0, _) => OperationResult::Failure,
        _ => OperationResult::Partial,
    };

    let mut builder = DomainEvent::new(service, EventCategory::Metrics, "metrics_ingested")
        .duration_ms(duration_ms)
        .metadata(serde_json::json!({ "accepted": accepted, "rejected": rejected }))
        .result(result);
    if result == OperationResult::Failure {
        builder = builder.failure("all metrics rejected");
    }
    builder.emit();
}

/// Log an SLA breach observed on the dashboard
pub fn log_sla_breach(service: &str, organization_id: &str, breaches: &[String]) {
    DomainEvent::new(service, EventCategory::Dashboard, "sla_breach")
        .organization(organization_id)
        .result(OperationResult::Partial)
        .metadata(serde_json::json!({ "breaches": breaches }))
        .emit();
}

/// Log completion of a contact import job
pub fn log_import_finished(
    service: &str,
    organization_id: &str,
    import_id: &str,
    success_count: usize,
    error_count: usize,
    error: Option<&str>,
) {
    let mut builder = DomainEvent::new(service, EventCategory::Import, "import_finished")
        .entity("import", import_id)
        .organization(organization_id)
        .metadata(serde_json::json!({
            "success_count": success_count,
            "error_count": error_count
        }));

    builder = match error {
        Some(err) => builder.failure(err),
        None if error_count > 0 => builder.result(OperationResult::Partial),
        None => builder.success(),
    };

    builder.emit();
}
