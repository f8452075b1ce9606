use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const MAX_SEARCH_PAGE_SIZE: i64 = 100;
pub const MAX_BULK_CONTACTS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateContactRequest {
    pub organization_id: Uuid,
    pub phone_number: String,
    #[validate(length(min = 1, max = 50, message = "first_name must be 1-50 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "last_name must be 1-50 characters"))]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update. `version` must equal the stored version.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateContactRequest {
    #[validate(length(min = 1, max = 50, message = "first_name must be 1-50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "last_name must be 1-50 characters"))]
    pub last_name: Option<String>,
    /// An empty string clears the email
    pub email: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactSearchParams {
    pub organization_id: Uuid,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub group_id: Option<Uuid>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

pub(crate) fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkCreateRequest {
    pub contacts: Vec<CreateContactRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkItemResult {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkCreateResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BulkItemResult>,
}
