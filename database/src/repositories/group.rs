use async_trait::async_trait;
use anyhow::{Context, Result};
use sqlx::{query, query_as, query_scalar, PgPool};
use uuid::Uuid;

use crate::models::{Group, GroupQuery, PaginatedResult, Pagination};
use super::GroupStore;

pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const GROUP_COLUMNS: &str = r#"
    g.id, g.organization_id, g.name, g.description, g.metadata, g.is_active, g.is_deleted,
    g.version, g.last_modified_by, g.created_at, g.updated_at,
    (SELECT COUNT(*) FROM group_members m WHERE m.group_id = g.id AND m.is_active) AS member_count
"#;

#[async_trait]
impl GroupStore for GroupRepository {
    async fn insert_group(&self, group: &Group) -> Result<Group> {
        query(
            r#"
            INSERT INTO groups
                (id, organization_id, name, description, metadata, is_active, is_deleted,
                 version, last_modified_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(group.id)
        .bind(group.organization_id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.metadata)
        .bind(group.is_active)
        .bind(group.is_deleted)
        .bind(group.version)
        .bind(group.last_modified_by)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create group")?;

        self.find_group(&group.organization_id, &group.id)
            .await?
            .context("Created group not found")
    }

    async fn find_group(&self, organization_id: &Uuid, id: &Uuid) -> Result<Option<Group>> {
        let group = query_as::<_, Group>(&format!(
            "SELECT {} FROM groups g WHERE g.id = $1 AND g.organization_id = $2 AND NOT g.is_deleted",
            GROUP_COLUMNS
        ))
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find group")?;

        Ok(group)
    }

    async fn find_group_by_name(&self, organization_id: &Uuid, name: &str) -> Result<Option<Group>> {
        let group = query_as::<_, Group>(&format!(
            "SELECT {} FROM groups g WHERE g.organization_id = $1 AND LOWER(g.name) = LOWER($2) AND NOT g.is_deleted",
            GROUP_COLUMNS
        ))
        .bind(organization_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find group by name")?;

        Ok(group)
    }

    async fn update_group(&self, group: &Group, expected_version: i32) -> Result<Option<Group>> {
        let result = query(
            r#"
            UPDATE groups
            SET name = $1, description = $2, metadata = $3, is_active = $4,
                version = $5, last_modified_by = $6, updated_at = $7
            WHERE id = $8 AND organization_id = $9 AND version = $10 AND NOT is_deleted
            "#,
        )
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.metadata)
        .bind(group.is_active)
        .bind(group.version)
        .bind(group.last_modified_by)
        .bind(group.updated_at)
        .bind(group.id)
        .bind(group.organization_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .context("Failed to update group")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_group(&group.organization_id, &group.id).await
    }

    async fn soft_delete_group(&self, organization_id: &Uuid, id: &Uuid) -> Result<bool> {
        let result = query(
            r#"
            UPDATE groups
            SET is_deleted = TRUE, is_active = FALSE, version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND organization_id = $2 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .execute(&self.pool)
        .await
        .context("Failed to delete group")?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_groups(&self, list: &GroupQuery, pagination: &Pagination) -> Result<PaginatedResult<Group>> {
        let pattern = list
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("%{}%", s.trim()));

        let filter = r#"
            FROM groups g
            WHERE g.organization_id = $1 AND NOT g.is_deleted
              AND ($2::TEXT IS NULL OR g.name ILIKE $2 OR g.description ILIKE $2)
        "#;

        let total: i64 = query_scalar(&format!("SELECT COUNT(*) {}", filter))
            .bind(list.organization_id)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count groups")?;

        // Name sorts ascending, timestamps newest first
        let order = match list.sort_by.column() {
            "name" => "g.name ASC",
            "updated_at" => "g.updated_at DESC",
            _ => "g.created_at DESC",
        };

        let groups = query_as::<_, Group>(&format!(
            "SELECT {} {} ORDER BY {} LIMIT $3 OFFSET $4",
            GROUP_COLUMNS, filter, order
        ))
        .bind(list.organization_id)
        .bind(&pattern)
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list groups")?;

        Ok(PaginatedResult::new(groups, total, pagination))
    }

    async fn member_count(&self, group_id: &Uuid) -> Result<i64> {
        let count: i64 = query_scalar(
            "SELECT COUNT(*) FROM group_members WHERE group_id = $1 AND is_active",
        )
        .bind(group_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count group members")?;

        Ok(count)
    }

    async fn active_member_ids(&self, group_id: &Uuid, contact_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let found: Vec<Uuid> = query_scalar(
            "SELECT contact_id FROM group_members WHERE group_id = $1 AND contact_id = ANY($2) AND is_active",
        )
        .bind(group_id)
        .bind(contact_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to check group members")?;

        Ok(found)
    }

    async fn add_members(&self, group_id: &Uuid, contact_ids: &[Uuid], added_by: Option<Uuid>) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;
        let mut added = 0u64;

        for contact_id in contact_ids {
            let result = query(
                r#"
                INSERT INTO group_members (group_id, contact_id, added_at, added_by, is_active)
                VALUES ($1, $2, CURRENT_TIMESTAMP, $3, TRUE)
                ON CONFLICT (group_id, contact_id) DO UPDATE
                SET is_active = TRUE, added_at = EXCLUDED.added_at, added_by = EXCLUDED.added_by
                WHERE NOT group_members.is_active
                "#,
            )
            .bind(group_id)
            .bind(contact_id)
            .bind(added_by)
            .execute(&mut *tx)
            .await
            .context("Failed to add group member")?;

            added += result.rows_affected();
        }

        query("UPDATE groups SET updated_at = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await
            .context("Failed to touch group")?;

        tx.commit().await.context("Failed to commit group members")?;
        Ok(added)
    }

    async fn remove_members(&self, group_id: &Uuid, contact_ids: &[Uuid]) -> Result<u64> {
        let result = query(
            r#"
            UPDATE group_members SET is_active = FALSE
            WHERE group_id = $1 AND contact_id = ANY($2) AND is_active
            "#,
        )
        .bind(group_id)
        .bind(contact_ids)
        .execute(&self.pool)
        .await
        .context("Failed to remove group members")?;

        Ok(result.rows_affected())
    }
}
