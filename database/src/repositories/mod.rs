// Repository pattern for database operations

pub mod metric;
pub mod report;
pub mod contact;
pub mod group;
pub mod memory;

pub use metric::MetricRepository;
pub use report::ReportRepository;
pub use contact::ContactRepository;
pub use group::GroupRepository;
pub use memory::MemoryStore;

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Contact, ContactQuery, Group, GroupQuery, MetricRow, PaginatedResult, Pagination, ReportRow,
};

/// Storage for validated metric observations
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn insert_metrics(&self, rows: &[MetricRow]) -> Result<u64>;

    /// Valid metrics of one kind with `start <= timestamp < end`, oldest first
    async fn find_metrics(
        &self,
        organization_id: &str,
        kind: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricRow>>;

    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn save_report(&self, report: &ReportRow) -> Result<()>;

    async fn find_report(&self, id: &Uuid, organization_id: &str) -> Result<Option<ReportRow>>;
}

/// Contact persistence. Lookups never return soft-deleted rows.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn insert_contact(&self, contact: &Contact) -> Result<Contact>;

    async fn find_contact(&self, id: &Uuid) -> Result<Option<Contact>>;

    async fn find_contact_by_phone(&self, organization_id: &Uuid, phone_number: &str) -> Result<Option<Contact>>;

    /// Writes `contact` only if the stored version still equals `expected_version`.
    /// Returns `None` when the row is missing or the version moved on.
    async fn update_contact(&self, contact: &Contact, expected_version: i32) -> Result<Option<Contact>>;

    async fn soft_delete_contact(&self, id: &Uuid) -> Result<bool>;

    async fn search_contacts(&self, query: &ContactQuery, pagination: &Pagination) -> Result<PaginatedResult<Contact>>;

    /// Subset of `ids` that exist in the organization
    async fn existing_contact_ids(&self, organization_id: &Uuid, ids: &[Uuid]) -> Result<Vec<Uuid>>;

    async fn ping(&self) -> Result<()>;
}

/// Group persistence. Lookups never return soft-deleted rows.
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn insert_group(&self, group: &Group) -> Result<Group>;

    async fn find_group(&self, organization_id: &Uuid, id: &Uuid) -> Result<Option<Group>>;

    async fn find_group_by_name(&self, organization_id: &Uuid, name: &str) -> Result<Option<Group>>;

    async fn update_group(&self, group: &Group, expected_version: i32) -> Result<Option<Group>>;

    async fn soft_delete_group(&self, organization_id: &Uuid, id: &Uuid) -> Result<bool>;

    async fn list_groups(&self, query: &GroupQuery, pagination: &Pagination) -> Result<PaginatedResult<Group>>;

    async fn member_count(&self, group_id: &Uuid) -> Result<i64>;

    /// The subset of `contact_ids` already active in the group
    async fn active_member_ids(&self, group_id: &Uuid, contact_ids: &[Uuid]) -> Result<Vec<Uuid>>;

    /// Adds active memberships, returning how many contacts were newly added
    async fn add_members(&self, group_id: &Uuid, contact_ids: &[Uuid], added_by: Option<Uuid>) -> Result<u64>;

    async fn remove_members(&self, group_id: &Uuid, contact_ids: &[Uuid]) -> Result<u64>;
}

/// Repository manager that provides access to all repositories
#[derive(Clone)]
pub struct RepositoryManager {
    pool: PgPool,
}

impl RepositoryManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn metrics(&self) -> MetricRepository {
        MetricRepository::new(self.pool.clone())
    }

    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    pub fn contacts(&self) -> ContactRepository {
        ContactRepository::new(self.pool.clone())
    }

    pub fn groups(&self) -> GroupRepository {
        GroupRepository::new(self.pool.clone())
    }
}
