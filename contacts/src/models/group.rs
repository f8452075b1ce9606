use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use courier_database::models::GroupSort;

pub const MAX_GROUP_PAGE_SIZE: i64 = 200;
pub const MAX_MEMBERSHIP_BATCH: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub is_active: Option<bool>,
    pub version: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupListParams {
    pub organization_id: Uuid,
    #[serde(default = "super::contact::default_page")]
    pub page: i64,
    #[serde(default = "default_group_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: GroupSort,
}

fn default_group_page_size() -> i64 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipRequest {
    pub contact_ids: Vec<Uuid>,
    #[serde(default)]
    pub added_by: Option<Uuid>,
}

/// Outcome of a bulk membership change
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MembershipResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}
