//! In-process store implementing every repository trait.
//!
//! Used by service tests and local runs that have no Postgres available.

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    Contact, ContactQuery, Group, GroupMember, GroupQuery, GroupSort, MetricRow, PaginatedResult,
    Pagination, ReportRow,
};
use super::{ContactStore, GroupStore, MetricStore, ReportStore};

#[derive(Clone, Default)]
pub struct MemoryStore {
    metrics: Arc<RwLock<Vec<MetricRow>>>,
    reports: Arc<DashMap<Uuid, ReportRow>>,
    contacts: Arc<DashMap<Uuid, Contact>>,
    groups: Arc<DashMap<Uuid, Group>>,
    members: Arc<DashMap<(Uuid, Uuid), GroupMember>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.read().len()
    }

    fn active_members(&self, group_id: &Uuid) -> i64 {
        self.members
            .iter()
            .filter(|m| m.group_id == *group_id && m.is_active)
            .count() as i64
    }

    fn with_member_count(&self, mut group: Group) -> Group {
        group.member_count = self.active_members(&group.id);
        group
    }

    fn page<T: Clone>(items: Vec<T>, pagination: &Pagination) -> PaginatedResult<T> {
        let total = items.len() as i64;
        let page = items
            .into_iter()
            .skip(pagination.offset.max(0) as usize)
            .take(pagination.limit.max(0) as usize)
            .collect();
        PaginatedResult::new(page, total, pagination)
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn insert_metrics(&self, rows: &[MetricRow]) -> Result<u64> {
        self.metrics.write().extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    async fn find_metrics(
        &self,
        organization_id: &str,
        kind: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricRow>> {
        let mut rows: Vec<MetricRow> = self
            .metrics
            .read()
            .iter()
            .filter(|m| {
                m.organization_id == organization_id
                    && m.kind == kind
                    && m.is_valid
                    && m.timestamp >= start
                    && m.timestamp < end
            })
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.timestamp);
        Ok(rows)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn save_report(&self, report: &ReportRow) -> Result<()> {
        self.reports.entry(report.id).or_insert_with(|| report.clone());
        Ok(())
    }

    async fn find_report(&self, id: &Uuid, organization_id: &str) -> Result<Option<ReportRow>> {
        Ok(self
            .reports
            .get(id)
            .filter(|r| r.organization_id == organization_id)
            .map(|r| r.clone()))
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn insert_contact(&self, contact: &Contact) -> Result<Contact> {
        self.contacts.insert(contact.id, contact.clone());
        Ok(contact.clone())
    }

    async fn find_contact(&self, id: &Uuid) -> Result<Option<Contact>> {
        Ok(self
            .contacts
            .get(id)
            .filter(|c| !c.is_deleted)
            .map(|c| c.clone()))
    }

    async fn find_contact_by_phone(&self, organization_id: &Uuid, phone_number: &str) -> Result<Option<Contact>> {
        Ok(self
            .contacts
            .iter()
            .find(|c| {
                c.organization_id == *organization_id
                    && c.phone_number == phone_number
                    && !c.is_deleted
            })
            .map(|c| c.clone()))
    }

    async fn update_contact(&self, contact: &Contact, expected_version: i32) -> Result<Option<Contact>> {
        match self.contacts.get_mut(&contact.id) {
            Some(mut stored) if !stored.is_deleted && stored.version == expected_version => {
                *stored = contact.clone();
                Ok(Some(contact.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn soft_delete_contact(&self, id: &Uuid) -> Result<bool> {
        match self.contacts.get_mut(id) {
            Some(mut stored) if !stored.is_deleted => {
                stored.is_deleted = true;
                stored.is_active = false;
                stored.version += 1;
                stored.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn search_contacts(&self, query: &ContactQuery, pagination: &Pagination) -> Result<PaginatedResult<Contact>> {
        let text = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty());

        let mut matches: Vec<Contact> = self
            .contacts
            .iter()
            .filter(|c| c.organization_id == query.organization_id && !c.is_deleted)
            .filter(|c| text.map(|t| c.matches_text(t)).unwrap_or(true))
            .filter(|c| match query.group_id {
                Some(group_id) => self
                    .members
                    .get(&(group_id, c.id))
                    .map(|m| m.is_active)
                    .unwrap_or(false),
                None => true,
            })
            .map(|c| c.clone())
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(Self::page(matches, pagination))
    }

    async fn existing_contact_ids(&self, organization_id: &Uuid, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        Ok(ids
            .iter()
            .filter(|id| {
                self.contacts
                    .get(id)
                    .map(|c| c.organization_id == *organization_id && !c.is_deleted)
                    .unwrap_or(false)
            })
            .copied()
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn insert_group(&self, group: &Group) -> Result<Group> {
        self.groups.insert(group.id, group.clone());
        Ok(self.with_member_count(group.clone()))
    }

    async fn find_group(&self, organization_id: &Uuid, id: &Uuid) -> Result<Option<Group>> {
        let group = self
            .groups
            .get(id)
            .filter(|g| g.organization_id == *organization_id && !g.is_deleted)
            .map(|g| g.clone());
        Ok(group.map(|g| self.with_member_count(g)))
    }

    async fn find_group_by_name(&self, organization_id: &Uuid, name: &str) -> Result<Option<Group>> {
        let name = name.to_lowercase();
        let group = self
            .groups
            .iter()
            .find(|g| {
                g.organization_id == *organization_id
                    && !g.is_deleted
                    && g.name.to_lowercase() == name
            })
            .map(|g| g.clone());
        Ok(group.map(|g| self.with_member_count(g)))
    }

    async fn update_group(&self, group: &Group, expected_version: i32) -> Result<Option<Group>> {
        let updated = match self.groups.get_mut(&group.id) {
            Some(mut stored)
                if !stored.is_deleted
                    && stored.organization_id == group.organization_id
                    && stored.version == expected_version =>
            {
                *stored = group.clone();
                true
            }
            _ => false,
        };

        Ok(updated.then(|| self.with_member_count(group.clone())))
    }

    async fn soft_delete_group(&self, organization_id: &Uuid, id: &Uuid) -> Result<bool> {
        match self.groups.get_mut(id) {
            Some(mut stored) if !stored.is_deleted && stored.organization_id == *organization_id => {
                stored.is_deleted = true;
                stored.is_active = false;
                stored.version += 1;
                stored.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_groups(&self, query: &GroupQuery, pagination: &Pagination) -> Result<PaginatedResult<Group>> {
        let search = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut groups: Vec<Group> = self
            .groups
            .iter()
            .filter(|g| g.organization_id == query.organization_id && !g.is_deleted)
            .filter(|g| match &search {
                Some(needle) => {
                    g.name.to_lowercase().contains(needle)
                        || g.description
                            .as_deref()
                            .map(|d| d.to_lowercase().contains(needle))
                            .unwrap_or(false)
                }
                None => true,
            })
            .map(|g| g.clone())
            .collect();

        match query.sort_by {
            GroupSort::Name => groups.sort_by(|a, b| a.name.cmp(&b.name)),
            GroupSort::UpdatedAt => groups.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
            GroupSort::CreatedAt => groups.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        let groups = groups.into_iter().map(|g| self.with_member_count(g)).collect();
        Ok(Self::page(groups, pagination))
    }

    async fn member_count(&self, group_id: &Uuid) -> Result<i64> {
        Ok(self.active_members(group_id))
    }

    async fn active_member_ids(&self, group_id: &Uuid, contact_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        Ok(contact_ids
            .iter()
            .filter(|id| {
                self.members
                    .get(&(*group_id, **id))
                    .map(|m| m.is_active)
                    .unwrap_or(false)
            })
            .copied()
            .collect())
    }

    async fn add_members(&self, group_id: &Uuid, contact_ids: &[Uuid], added_by: Option<Uuid>) -> Result<u64> {
        let mut added = 0u64;
        for contact_id in contact_ids {
            let key = (*group_id, *contact_id);
            let already_active = self.members.get(&key).map(|m| m.is_active).unwrap_or(false);
            if already_active {
                continue;
            }
            self.members.insert(
                key,
                GroupMember {
                    group_id: *group_id,
                    contact_id: *contact_id,
                    added_at: Utc::now(),
                    added_by,
                    is_active: true,
                },
            );
            added += 1;
        }
        Ok(added)
    }

    async fn remove_members(&self, group_id: &Uuid, contact_ids: &[Uuid]) -> Result<u64> {
        let mut removed = 0u64;
        for contact_id in contact_ids {
            if let Some(mut member) = self.members.get_mut(&(*group_id, *contact_id)) {
                if member.is_active {
                    member.is_active = false;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}
