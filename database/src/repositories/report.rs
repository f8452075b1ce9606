use async_trait::async_trait;
use anyhow::{Context, Result};
use sqlx::{query, query_as, PgPool};
use uuid::Uuid;

use crate::models::ReportRow;
use super::ReportStore;

pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn save_report(&self, report: &ReportRow) -> Result<()> {
        query(
            r#"
            INSERT INTO reports (id, organization_id, report_type, start_time, end_time, document, generated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(report.id)
        .bind(&report.organization_id)
        .bind(&report.report_type)
        .bind(report.start_time)
        .bind(report.end_time)
        .bind(&report.document)
        .bind(report.generated_at)
        .execute(&self.pool)
        .await
        .context("Failed to save report")?;

        Ok(())
    }

    async fn find_report(&self, id: &Uuid, organization_id: &str) -> Result<Option<ReportRow>> {
        let report = query_as::<_, ReportRow>(
            "SELECT * FROM reports WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find report")?;

        Ok(report)
    }
}
