use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use courier_config::ServiceSettings;
use courier_database::models::{Contact, ContactQuery, PaginatedResult, Pagination};
use courier_database::repositories::ContactStore;
use courier_database::{CacheKeyBuilder, TimedCache};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ContactError, ContactResult};
use crate::models::{
    BulkCreateResult, BulkItemResult, ContactSearchParams, CreateContactRequest,
    UpdateContactRequest, MAX_BULK_CONTACTS, MAX_SEARCH_PAGE_SIZE,
};
use crate::services::validation::{normalize_email, normalize_phone, normalize_tags};
use crate::services::{check_page, with_db_timeout};

/// Contact CRUD with a cache-aside layer keyed by contact id
#[derive(Clone)]
pub struct ContactManager {
    store: Arc<dyn ContactStore>,
    cache: TimedCache,
    db_timeout: Duration,
    cache_ttl: Duration,
}

impl ContactManager {
    pub fn new(store: Arc<dyn ContactStore>, cache: TimedCache, settings: &ServiceSettings) -> Self {
        Self {
            store,
            cache,
            db_timeout: settings.db_timeout,
            cache_ttl: Duration::from_secs(settings.contact_cache_ttl_secs),
        }
    }

    pub async fn create(&self, request: CreateContactRequest) -> ContactResult<Contact> {
        request.validate()?;
        let phone_number = normalize_phone(&request.phone_number)?;
        let email = normalize_email(request.email)?;

        let existing = with_db_timeout(
            self.db_timeout,
            "find contact by phone",
            self.store.find_contact_by_phone(&request.organization_id, &phone_number),
        )
        .await?;
        if existing.is_some() {
            return Err(ContactError::Conflict(format!(
                "Contact with phone number {} already exists",
                phone_number
            )));
        }

        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            organization_id: request.organization_id,
            phone_number,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email,
            metadata: request.metadata.unwrap_or_else(|| serde_json::json!({})),
            tags: normalize_tags(request.tags),
            is_active: true,
            is_deleted: false,
            version: 1,
            created_at: now,
            updated_at: now,
            last_contacted_at: None,
        };

        let contact = with_db_timeout(self.db_timeout, "insert contact", self.store.insert_contact(&contact)).await?;
        self.cache
            .set_json(&CacheKeyBuilder::contact(&contact.id), &contact, self.cache_ttl)
            .await;

        tracing::info!(
            contact_id = %contact.id,
            organization_id = %contact.organization_id,
            "Contact created"
        );
        Ok(contact)
    }

    pub async fn get(&self, id: Uuid) -> ContactResult<Contact> {
        let key = CacheKeyBuilder::contact(&id);
        if let Some(contact) = self.cache.get_json::<Contact>(&key).await {
            return Ok(contact);
        }

        let contact = self.load(id).await?;
        self.cache.set_json(&key, &contact, self.cache_ttl).await;
        Ok(contact)
    }

    pub async fn update(&self, id: Uuid, request: UpdateContactRequest) -> ContactResult<Contact> {
        request.validate()?;

        // Always read the row itself so the version check never sees a stale cache entry
        let current = self.load(id).await?;
        if request.version != current.version {
            return Err(ContactError::Conflict(format!(
                "Version conflict: expected {}, found {}",
                request.version, current.version
            )));
        }

        let mut updated = current.clone();
        if let Some(first_name) = request.first_name {
            updated.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            updated.last_name = last_name.trim().to_string();
        }
        if request.email.is_some() {
            updated.email = normalize_email(request.email)?;
        }
        if let Some(metadata) = request.metadata {
            updated.metadata = metadata;
        }
        if let Some(tags) = request.tags {
            updated.tags = normalize_tags(tags);
        }
        if let Some(is_active) = request.is_active {
            updated.is_active = is_active;
        }
        if let Some(last_contacted_at) = request.last_contacted_at {
            updated.last_contacted_at = Some(last_contacted_at);
        }
        updated.version = current.version + 1;
        updated.updated_at = Utc::now();

        let saved = with_db_timeout(
            self.db_timeout,
            "update contact",
            self.store.update_contact(&updated, current.version),
        )
        .await?
        .ok_or_else(|| {
            ContactError::Conflict(format!("Contact {} was modified concurrently", id))
        })?;

        self.cache
            .set_json(&CacheKeyBuilder::contact(&id), &saved, self.cache_ttl)
            .await;
        Ok(saved)
    }

    pub async fn delete(&self, id: Uuid) -> ContactResult<()> {
        let deleted = with_db_timeout(self.db_timeout, "delete contact", self.store.soft_delete_contact(&id)).await?;
        if !deleted {
            return Err(ContactError::NotFound(format!("Contact not found: {}", id)));
        }

        self.cache.delete(&CacheKeyBuilder::contact(&id)).await;
        tracing::info!(contact_id = %id, "Contact deleted");
        Ok(())
    }

    pub async fn search(&self, params: ContactSearchParams) -> ContactResult<PaginatedResult<Contact>> {
        check_page(params.page, params.page_size, MAX_SEARCH_PAGE_SIZE)?;

        let query = ContactQuery {
            organization_id: params.organization_id,
            text: params.query.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            group_id: params.group_id,
        };
        let pagination = Pagination::page(params.page, params.page_size);

        with_db_timeout(
            self.db_timeout,
            "search contacts",
            self.store.search_contacts(&query, &pagination),
        )
        .await
    }

    /// Creates each contact independently; one failure does not stop the rest
    pub async fn bulk_create(&self, requests: Vec<CreateContactRequest>) -> ContactResult<BulkCreateResult> {
        if requests.is_empty() || requests.len() > MAX_BULK_CONTACTS {
            return Err(ContactError::Validation(format!(
                "contacts must contain between 1 and {} entries",
                MAX_BULK_CONTACTS
            )));
        }

        let total = requests.len();
        let mut results = Vec::with_capacity(total);
        for (index, request) in requests.into_iter().enumerate() {
            let result = match self.create(request).await {
                Ok(contact) => BulkItemResult {
                    index,
                    success: true,
                    contact_id: Some(contact.id),
                    error: None,
                },
                Err(ContactError::Dependency(message)) => return Err(ContactError::Dependency(message)),
                Err(e) => BulkItemResult {
                    index,
                    success: false,
                    contact_id: None,
                    error: Some(e.to_string()),
                },
            };
            results.push(result);
        }

        let successful = results.iter().filter(|r| r.success).count();
        Ok(BulkCreateResult {
            total,
            successful,
            failed: total - successful,
            results,
        })
    }

    pub async fn is_healthy(&self) -> bool {
        matches!(
            tokio::time::timeout(self.db_timeout, self.store.ping()).await,
            Ok(Ok(()))
        )
    }

    async fn load(&self, id: Uuid) -> ContactResult<Contact> {
        with_db_timeout(self.db_timeout, "load contact", self.store.find_contact(&id))
            .await?
            .ok_or_else(|| ContactError::NotFound(format!("Contact not found: {}", id)))
    }
}
