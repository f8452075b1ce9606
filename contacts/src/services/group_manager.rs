use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use courier_config::ServiceSettings;
use courier_database::models::{Group, GroupQuery, PaginatedResult, Pagination, MAX_GROUP_MEMBERS};
use courier_database::repositories::{ContactStore, GroupStore};
use courier_database::{CacheKeyBuilder, TimedCache};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ContactError, ContactResult};
use crate::models::{
    CreateGroupRequest, GroupListParams, MembershipRequest, MembershipResult, UpdateGroupRequest,
    MAX_GROUP_PAGE_SIZE, MAX_MEMBERSHIP_BATCH,
};
use crate::services::{check_page, with_db_timeout};

const MEMBERSHIP_CHUNK: usize = 100;

#[derive(Clone)]
pub struct GroupManager {
    groups: Arc<dyn GroupStore>,
    contacts: Arc<dyn ContactStore>,
    cache: TimedCache,
    db_timeout: Duration,
    cache_ttl: Duration,
}

impl GroupManager {
    pub fn new(
        groups: Arc<dyn GroupStore>,
        contacts: Arc<dyn ContactStore>,
        cache: TimedCache,
        settings: &ServiceSettings,
    ) -> Self {
        Self {
            groups,
            contacts,
            cache,
            db_timeout: settings.db_timeout,
            cache_ttl: Duration::from_secs(settings.group_cache_ttl_secs),
        }
    }

    pub async fn create(&self, organization_id: Uuid, request: CreateGroupRequest) -> ContactResult<Group> {
        request.validate()?;
        let name = required_name(&request.name)?;
        self.ensure_name_free(organization_id, &name, None).await?;

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            organization_id,
            name,
            description: request.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            metadata: request.metadata.unwrap_or_else(|| serde_json::json!({})),
            is_active: true,
            is_deleted: false,
            version: 1,
            member_count: 0,
            last_modified_by: None,
            created_at: now,
            updated_at: now,
        };

        let group = with_db_timeout(self.db_timeout, "insert group", self.groups.insert_group(&group)).await?;
        self.cache
            .set_json(&CacheKeyBuilder::group(&group.id), &group, self.cache_ttl)
            .await;

        tracing::info!(group_id = %group.id, organization_id = %organization_id, "Group created");
        Ok(group)
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> ContactResult<Group> {
        let key = CacheKeyBuilder::group(&id);
        if let Some(group) = self.cache.get_json::<Group>(&key).await {
            // Group ids are global; never serve another organization's entry
            if group.organization_id == organization_id {
                return Ok(group);
            }
        }

        let group = self.load(organization_id, id).await?;
        self.cache.set_json(&key, &group, self.cache_ttl).await;
        Ok(group)
    }

    pub async fn update(&self, organization_id: Uuid, id: Uuid, request: UpdateGroupRequest) -> ContactResult<Group> {
        request.validate()?;

        let current = self.load(organization_id, id).await?;
        if request.version != current.version {
            return Err(ContactError::Conflict(format!(
                "Version conflict: expected {}, found {}",
                request.version, current.version
            )));
        }

        let mut updated = current.clone();
        if let Some(name) = request.name {
            let name = required_name(&name)?;
            if !name.eq_ignore_ascii_case(&current.name) {
                self.ensure_name_free(organization_id, &name, Some(id)).await?;
            }
            updated.name = name;
        }
        if let Some(description) = request.description {
            updated.description = Some(description.trim().to_string()).filter(|d| !d.is_empty());
        }
        if let Some(metadata) = request.metadata {
            updated.metadata = metadata;
        }
        if let Some(is_active) = request.is_active {
            updated.is_active = is_active;
        }
        updated.version = current.version + 1;
        updated.updated_at = Utc::now();

        let saved = with_db_timeout(
            self.db_timeout,
            "update group",
            self.groups.update_group(&updated, current.version),
        )
        .await?
        .ok_or_else(|| ContactError::Conflict(format!("Group {} was modified concurrently", id)))?;

        self.cache
            .set_json(&CacheKeyBuilder::group(&id), &saved, self.cache_ttl)
            .await;
        Ok(saved)
    }

    pub async fn delete(&self, organization_id: Uuid, id: Uuid) -> ContactResult<()> {
        let deleted = with_db_timeout(
            self.db_timeout,
            "delete group",
            self.groups.soft_delete_group(&organization_id, &id),
        )
        .await?;
        if !deleted {
            return Err(ContactError::NotFound(format!("Group not found: {}", id)));
        }

        self.cache.delete(&CacheKeyBuilder::group(&id)).await;
        tracing::info!(group_id = %id, organization_id = %organization_id, "Group deleted");
        Ok(())
    }

    pub async fn list(&self, params: GroupListParams) -> ContactResult<PaginatedResult<Group>> {
        check_page(params.page, params.page_size, MAX_GROUP_PAGE_SIZE)?;

        let query = GroupQuery {
            organization_id: params.organization_id,
            search: params.search,
            sort_by: params.sort_by,
        };
        with_db_timeout(
            self.db_timeout,
            "list groups",
            self.groups.list_groups(&query, &Pagination::page(params.page, params.page_size)),
        )
        .await
    }

    /// Adds contacts in chunks, stopping at the group member limit. Unknown
    /// or foreign contacts are reported per id rather than failing the batch.
    pub async fn add_contacts(
        &self,
        organization_id: Uuid,
        group_id: Uuid,
        request: MembershipRequest,
    ) -> ContactResult<MembershipResult> {
        let ids = dedupe_ids(request.contact_ids)?;
        self.load(organization_id, group_id).await?;

        let mut result = MembershipResult {
            total: ids.len(),
            ..Default::default()
        };

        for chunk in ids.chunks(MEMBERSHIP_CHUNK) {
            let existing: HashSet<Uuid> = with_db_timeout(
                self.db_timeout,
                "check contacts",
                self.contacts.existing_contact_ids(&organization_id, chunk),
            )
            .await?
            .into_iter()
            .collect();

            let mut valid = Vec::with_capacity(chunk.len());
            for id in chunk {
                if existing.contains(id) {
                    valid.push(*id);
                } else {
                    result.failed += 1;
                    result.errors.push(format!("Contact not found: {}", id));
                }
            }

            // Re-adding a current member succeeds without using capacity
            let members: HashSet<Uuid> = with_db_timeout(
                self.db_timeout,
                "check members",
                self.groups.active_member_ids(&group_id, &valid),
            )
            .await?
            .into_iter()
            .collect();
            let (already, mut new): (Vec<Uuid>, Vec<Uuid>) = valid.into_iter().partition(|id| members.contains(id));
            result.successful += already.len();

            let current = with_db_timeout(self.db_timeout, "count members", self.groups.member_count(&group_id)).await?;
            let capacity = (MAX_GROUP_MEMBERS - current).max(0) as usize;
            if new.len() > capacity {
                for id in new.drain(capacity..) {
                    result.failed += 1;
                    result.errors.push(format!(
                        "Group member limit of {} reached; contact {} not added",
                        MAX_GROUP_MEMBERS, id
                    ));
                }
            }

            if !new.is_empty() {
                with_db_timeout(
                    self.db_timeout,
                    "add members",
                    self.groups.add_members(&group_id, &new, request.added_by),
                )
                .await?;
                result.successful += new.len();
            }
        }

        self.cache.delete(&CacheKeyBuilder::group(&group_id)).await;
        tracing::info!(
            group_id = %group_id,
            successful = result.successful,
            failed = result.failed,
            "Contacts added to group"
        );
        Ok(result)
    }

    pub async fn remove_contacts(
        &self,
        organization_id: Uuid,
        group_id: Uuid,
        request: MembershipRequest,
    ) -> ContactResult<MembershipResult> {
        let ids = dedupe_ids(request.contact_ids)?;
        self.load(organization_id, group_id).await?;

        let removed = with_db_timeout(
            self.db_timeout,
            "remove members",
            self.groups.remove_members(&group_id, &ids),
        )
        .await? as usize;

        let failed = ids.len() - removed.min(ids.len());
        let mut errors = Vec::new();
        if failed > 0 {
            errors.push(format!("{} contacts were not members of the group", failed));
        }

        self.cache.delete(&CacheKeyBuilder::group(&group_id)).await;
        Ok(MembershipResult {
            total: ids.len(),
            successful: removed,
            failed,
            errors,
        })
    }

    async fn load(&self, organization_id: Uuid, id: Uuid) -> ContactResult<Group> {
        with_db_timeout(self.db_timeout, "load group", self.groups.find_group(&organization_id, &id))
            .await?
            .ok_or_else(|| ContactError::NotFound(format!("Group not found: {}", id)))
    }

    async fn ensure_name_free(&self, organization_id: Uuid, name: &str, current: Option<Uuid>) -> ContactResult<()> {
        let existing = with_db_timeout(
            self.db_timeout,
            "find group by name",
            self.groups.find_group_by_name(&organization_id, name),
        )
        .await?;

        match existing {
            Some(group) if Some(group.id) != current => Err(ContactError::Conflict(format!(
                "Group with name '{}' already exists",
                name
            ))),
            _ => Ok(()),
        }
    }
}

fn required_name(raw: &str) -> ContactResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ContactError::Validation("name must not be blank".to_string()));
    }
    Ok(name.to_string())
}

fn dedupe_ids(ids: Vec<Uuid>) -> ContactResult<Vec<Uuid>> {
    if ids.is_empty() || ids.len() > MAX_MEMBERSHIP_BATCH {
        return Err(ContactError::Validation(format!(
            "contact_ids must contain between 1 and {} entries",
            MAX_MEMBERSHIP_BATCH
        )));
    }

    let mut seen = HashSet::with_capacity(ids.len());
    Ok(ids.into_iter().filter(|id| seen.insert(*id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_database::models::{Contact, GroupSort};
    use courier_database::repositories::MemoryStore;
    use courier_database::{CacheStore, MemoryCache};

    fn manager(store: Arc<MemoryStore>) -> GroupManager {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::default());
        GroupManager::new(
            store.clone(),
            store,
            TimedCache::new(cache, Duration::from_millis(500)),
            &ServiceSettings::with_defaults("contact-service", 3021),
        )
    }

    fn create(name: &str) -> CreateGroupRequest {
        CreateGroupRequest {
            name: name.to_string(),
            description: Some("Customers".to_string()),
            metadata: None,
        }
    }

    async fn seed_contacts(store: &MemoryStore, organization_id: Uuid, count: usize) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let now = Utc::now();
            let contact = Contact {
                id: Uuid::new_v4(),
                organization_id,
                phone_number: format!("+1415555{:04}", i),
                first_name: "Test".to_string(),
                last_name: format!("Contact{}", i),
                email: None,
                metadata: serde_json::json!({}),
                tags: Vec::new(),
                is_active: true,
                is_deleted: false,
                version: 1,
                created_at: now,
                updated_at: now,
                last_contacted_at: None,
            };
            store.insert_contact(&contact).await.unwrap();
            ids.push(contact.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_duplicate_name_is_conflict() {
        let manager = manager(Arc::new(MemoryStore::new()));
        let org = Uuid::new_v4();

        manager.create(org, create(" VIP ")).await.unwrap();
        let err = manager.create(org, create("vip")).await.unwrap_err();
        assert!(matches!(err, ContactError::Conflict(_)));

        assert!(manager.create(Uuid::new_v4(), create("vip")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_version_and_rename() {
        let manager = manager(Arc::new(MemoryStore::new()));
        let org = Uuid::new_v4();
        let group = manager.create(org, create("Leads")).await.unwrap();
        manager.create(org, create("Customers")).await.unwrap();

        let taken = manager
            .update(
                org,
                group.id,
                UpdateGroupRequest {
                    name: Some("customers".to_string()),
                    version: 1,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(taken, ContactError::Conflict(_)));

        // Case-only rename of itself is allowed
        let renamed = manager
            .update(
                org,
                group.id,
                UpdateGroupRequest {
                    name: Some("LEADS".to_string()),
                    version: 1,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.version, 2);
        assert_eq!(manager.get(org, group.id).await.unwrap().name, "LEADS");

        let stale = manager
            .update(org, group.id, UpdateGroupRequest { version: 1, ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(stale, ContactError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_is_scoped_to_organization() {
        let manager = manager(Arc::new(MemoryStore::new()));
        let org = Uuid::new_v4();
        let group = manager.create(org, create("Scoped")).await.unwrap();

        assert!(manager.get(org, group.id).await.is_ok());
        assert!(matches!(
            manager.get(Uuid::new_v4(), group.id).await,
            Err(ContactError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_contacts_reports_missing_and_limit() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store.clone());
        let org = Uuid::new_v4();
        let group = manager.create(org, create("Big")).await.unwrap();

        let mut ids = seed_contacts(&store, org, 260).await;
        let unknown = Uuid::new_v4();
        ids.push(unknown);
        ids.push(ids[0]);

        let result = manager
            .add_contacts(org, group.id, MembershipRequest { contact_ids: ids, added_by: None })
            .await
            .unwrap();

        assert_eq!(result.total, 261);
        assert_eq!(result.successful, 256);
        assert_eq!(result.failed, 5);
        assert!(result.errors.contains(&format!("Contact not found: {}", unknown)));
        assert_eq!(manager.get(org, group.id).await.unwrap().member_count, 256);
    }

    #[tokio::test]
    async fn test_readding_members_to_full_group_succeeds() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store.clone());
        let org = Uuid::new_v4();
        let group = manager.create(org, create("Full")).await.unwrap();
        let ids = seed_contacts(&store, org, 257).await;

        let filled = manager
            .add_contacts(org, group.id, MembershipRequest { contact_ids: ids[..256].to_vec(), added_by: None })
            .await
            .unwrap();
        assert_eq!(filled.successful, 256);

        let result = manager
            .add_contacts(
                org,
                group.id,
                MembershipRequest { contact_ids: vec![ids[0], ids[5], ids[256]], added_by: None },
            )
            .await
            .unwrap();

        assert_eq!(result.successful, 2);
        assert_eq!(result.failed, 1);
        assert!(result.errors[0].contains("member limit"));
        assert!(result.errors[0].contains(&ids[256].to_string()));
        assert_eq!(manager.get(org, group.id).await.unwrap().member_count, 256);
    }

    #[tokio::test]
    async fn test_remove_contacts_and_list() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store.clone());
        let org = Uuid::new_v4();
        let group = manager.create(org, create("Small")).await.unwrap();
        manager.create(org, create("Another")).await.unwrap();
        let ids = seed_contacts(&store, org, 3).await;

        manager
            .add_contacts(org, group.id, MembershipRequest { contact_ids: ids.clone(), added_by: None })
            .await
            .unwrap();
        let removed = manager
            .remove_contacts(
                org,
                group.id,
                MembershipRequest { contact_ids: vec![ids[0], Uuid::new_v4()], added_by: None },
            )
            .await
            .unwrap();
        assert_eq!(removed.successful, 1);
        assert_eq!(removed.failed, 1);

        let listed = manager
            .list(GroupListParams {
                organization_id: org,
                page: 1,
                page_size: 50,
                search: None,
                sort_by: GroupSort::Name,
            })
            .await
            .unwrap();
        assert_eq!(listed.total, 2);
        assert_eq!(listed.items[0].name, "Another");
        assert_eq!(listed.items[1].member_count, 2);

        let oversized = manager
            .list(GroupListParams {
                organization_id: org,
                page: 1,
                page_size: 201,
                search: None,
                sort_by: GroupSort::CreatedAt,
            })
            .await;
        assert!(matches!(oversized, Err(ContactError::Validation(_))));
    }

    #[tokio::test]
    async fn test_empty_membership_request_is_rejected() {
        let manager = manager(Arc::new(MemoryStore::new()));
        let err = manager
            .add_contacts(
                Uuid::new_v4(),
                Uuid::new_v4(),
                MembershipRequest { contact_ids: Vec::new(), added_by: None },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ContactError::Validation(_)));
    }
}
