use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::require_organization_id;
use crate::errors::AnalyticsError;
use crate::models::{ReportRequest, ReportType};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportLookup {
    pub organization_id: String,
}

async fn generate(
    state: web::Data<AppState>,
    request: web::Json<ReportRequest>,
    report_type: ReportType,
) -> Result<HttpResponse, AnalyticsError> {
    request
        .validate()
        .map_err(|e| AnalyticsError::Validation(e.to_string()))?;
    require_organization_id(&request.organization_id)?;

    let report = state.reports.generate(request.into_inner(), report_type).await?;
    Ok(HttpResponse::Ok().json(report))
}

pub async fn delivery_report(
    state: web::Data<AppState>,
    request: web::Json<ReportRequest>,
) -> Result<HttpResponse, AnalyticsError> {
    generate(state, request, ReportType::Delivery).await
}

pub async fn engagement_report(
    state: web::Data<AppState>,
    request: web::Json<ReportRequest>,
) -> Result<HttpResponse, AnalyticsError> {
    generate(state, request, ReportType::Engagement).await
}

pub async fn system_report(
    state: web::Data<AppState>,
    request: web::Json<ReportRequest>,
) -> Result<HttpResponse, AnalyticsError> {
    generate(state, request, ReportType::System).await
}

pub async fn get_report(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ReportLookup>,
) -> Result<HttpResponse, AnalyticsError> {
    require_organization_id(&query.organization_id)?;
    let report_id = Uuid::parse_str(&path)
        .map_err(|_| AnalyticsError::Validation(format!("Invalid report id: {}", path)))?;

    let report = state.reports.get_report(report_id, &query.organization_id).await?;
    Ok(HttpResponse::Ok().json(report))
}
