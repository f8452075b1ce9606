use async_trait::async_trait;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, PgPool};

use crate::models::MetricRow;
use super::MetricStore;

pub struct MetricRepository {
    pool: PgPool,
}

impl MetricRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricStore for MetricRepository {
    async fn insert_metrics(&self, rows: &[MetricRow]) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;
        let mut inserted = 0u64;

        for row in rows {
            let result = query(
                r#"
                INSERT INTO metrics
                    (id, organization_id, kind, timestamp, payload, metadata, is_valid, validation_errors, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(row.id)
            .bind(&row.organization_id)
            .bind(&row.kind)
            .bind(row.timestamp)
            .bind(&row.payload)
            .bind(&row.metadata)
            .bind(row.is_valid)
            .bind(&row.validation_errors)
            .bind(row.created_at)
            .execute(&mut *tx)
            .await
            .context("Failed to insert metric")?;

            inserted += result.rows_affected();
        }

        tx.commit().await.context("Failed to commit metrics")?;
        Ok(inserted)
    }

    async fn find_metrics(
        &self,
        organization_id: &str,
        kind: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricRow>> {
        let rows = query_as::<_, MetricRow>(
            r#"
            SELECT * FROM metrics
            WHERE organization_id = $1 AND kind = $2 AND is_valid
              AND timestamp >= $3 AND timestamp < $4
            ORDER BY timestamp
            "#,
        )
        .bind(organization_id)
        .bind(kind)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .context("Failed to find metrics in range")?;

        Ok(rows)
    }

    async fn ping(&self) -> Result<()> {
        query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }
}
