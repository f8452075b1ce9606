use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub metadata: serde_json::Value,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_contacted_at: Option<DateTime<Utc>>,
}

/// Filters for contact search
#[derive(Debug, Clone, Default)]
pub struct ContactQuery {
    pub organization_id: Uuid,
    /// Case-insensitive substring matched against names, phone and email
    pub text: Option<String>,
    pub group_id: Option<Uuid>,
}

impl Contact {
    /// Case-insensitive match used by search
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.first_name.to_lowercase().contains(&needle)
            || self.last_name.to_lowercase().contains(&needle)
            || self.phone_number.contains(&needle)
            || self
                .email
                .as_deref()
                .map(|e| e.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }
}

impl super::Model for Contact {
    type Id = Uuid;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
