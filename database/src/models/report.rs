use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use sqlx::FromRow;

/// Stored report document, written once when the report is generated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub organization_id: String,
    pub report_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub document: serde_json::Value,
    pub generated_at: DateTime<Utc>,
}

impl super::Model for ReportRow {
    type Id = Uuid;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}
