use async_trait::async_trait;
use anyhow::{Context, Result};
use sqlx::{query, query_as, query_scalar, PgPool};
use uuid::Uuid;

use crate::models::{Contact, ContactQuery, PaginatedResult, Pagination};
use super::ContactStore;

pub struct ContactRepository {
    pool: PgPool,
}

impl ContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// $1 organization, $2 optional ILIKE pattern, $3 optional group id
const SEARCH_FILTER: &str = r#"
    FROM contacts c
    WHERE c.organization_id = $1 AND NOT c.is_deleted
      AND ($2::TEXT IS NULL
           OR c.first_name ILIKE $2 OR c.last_name ILIKE $2
           OR c.phone_number ILIKE $2 OR c.email ILIKE $2)
      AND ($3::UUID IS NULL OR EXISTS (
           SELECT 1 FROM group_members m
           WHERE m.contact_id = c.id AND m.group_id = $3 AND m.is_active))
"#;

#[async_trait]
impl ContactStore for ContactRepository {
    async fn insert_contact(&self, contact: &Contact) -> Result<Contact> {
        let created = query_as::<_, Contact>(
            r#"
            INSERT INTO contacts
                (id, organization_id, phone_number, first_name, last_name, email, metadata, tags,
                 is_active, is_deleted, version, created_at, updated_at, last_contacted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(contact.id)
        .bind(contact.organization_id)
        .bind(&contact.phone_number)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(&contact.email)
        .bind(&contact.metadata)
        .bind(&contact.tags)
        .bind(contact.is_active)
        .bind(contact.is_deleted)
        .bind(contact.version)
        .bind(contact.created_at)
        .bind(contact.updated_at)
        .bind(contact.last_contacted_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create contact")?;

        Ok(created)
    }

    async fn find_contact(&self, id: &Uuid) -> Result<Option<Contact>> {
        let contact = query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find contact by id")?;

        Ok(contact)
    }

    async fn find_contact_by_phone(&self, organization_id: &Uuid, phone_number: &str) -> Result<Option<Contact>> {
        let contact = query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE organization_id = $1 AND phone_number = $2 AND NOT is_deleted",
        )
        .bind(organization_id)
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find contact by phone number")?;

        Ok(contact)
    }

    async fn update_contact(&self, contact: &Contact, expected_version: i32) -> Result<Option<Contact>> {
        let updated = query_as::<_, Contact>(
            r#"
            UPDATE contacts
            SET phone_number = $1, first_name = $2, last_name = $3, email = $4,
                metadata = $5, tags = $6, is_active = $7, version = $8, updated_at = $9,
                last_contacted_at = $10
            WHERE id = $11 AND version = $12 AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(&contact.phone_number)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(&contact.email)
        .bind(&contact.metadata)
        .bind(&contact.tags)
        .bind(contact.is_active)
        .bind(contact.version)
        .bind(contact.updated_at)
        .bind(contact.last_contacted_at)
        .bind(contact.id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update contact")?;

        Ok(updated)
    }

    async fn soft_delete_contact(&self, id: &Uuid) -> Result<bool> {
        let result = query(
            r#"
            UPDATE contacts
            SET is_deleted = TRUE, is_active = FALSE, version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to delete contact")?;

        Ok(result.rows_affected() > 0)
    }

    async fn search_contacts(&self, search: &ContactQuery, pagination: &Pagination) -> Result<PaginatedResult<Contact>> {
        let pattern = search
            .text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| format!("%{}%", t.trim()));

        let total: i64 = query_scalar(&format!("SELECT COUNT(*) {}", SEARCH_FILTER))
            .bind(search.organization_id)
            .bind(&pattern)
            .bind(search.group_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count contacts")?;

        let contacts = query_as::<_, Contact>(&format!(
            "SELECT c.* {} ORDER BY c.created_at DESC LIMIT $4 OFFSET $5",
            SEARCH_FILTER
        ))
        .bind(search.organization_id)
        .bind(&pattern)
        .bind(search.group_id)
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to search contacts")?;

        Ok(PaginatedResult::new(contacts, total, pagination))
    }

    async fn existing_contact_ids(&self, organization_id: &Uuid, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let found: Vec<Uuid> = query_scalar(
            "SELECT id FROM contacts WHERE organization_id = $1 AND id = ANY($2) AND NOT is_deleted",
        )
        .bind(organization_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to check contact ids")?;

        Ok(found)
    }

    async fn ping(&self) -> Result<()> {
        query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }
}
