use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use sqlx::FromRow;

/// Row in the `metrics` table. The kind-specific payload is kept as JSONB.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MetricRow {
    pub id: Uuid,
    pub organization_id: String,
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub metadata: serde_json::Value,
    pub is_valid: bool,
    pub validation_errors: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl super::Model for MetricRow {
    type Id = Uuid;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // Metrics are immutable once stored
    fn updated_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
