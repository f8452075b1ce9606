use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::require_organization_id;
use crate::errors::AnalyticsError;
use crate::models::DashboardPeriod;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub organization_id: String,
    pub time_period: DashboardPeriod,
    #[serde(default)]
    pub refresh_cache: bool,
}

pub async fn dashboard_metrics(
    state: web::Data<AppState>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AnalyticsError> {
    require_organization_id(&query.organization_id)?;

    let dashboard = state
        .dashboard
        .metrics(&query.organization_id, query.time_period, query.refresh_cache)
        .await?;
    Ok(HttpResponse::Ok().json(dashboard))
}
