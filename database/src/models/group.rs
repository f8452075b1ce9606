use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use sqlx::FromRow;

pub const MAX_GROUP_MEMBERS: i64 = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
    pub is_active: bool,
    pub is_deleted: bool,
    pub version: i32,
    pub member_count: i64,
    pub last_modified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub contact_id: Uuid,
    pub added_at: DateTime<Utc>,
    pub added_by: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupSort {
    #[default]
    CreatedAt,
    Name,
    UpdatedAt,
}

impl GroupSort {
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Name => "name",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// Filters for group listing
#[derive(Debug, Clone, Default)]
pub struct GroupQuery {
    pub organization_id: Uuid,
    pub search: Option<String>,
    pub sort_by: GroupSort,
}

impl super::Model for Group {
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
