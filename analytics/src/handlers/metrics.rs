use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::errors::AnalyticsError;
use crate::models::MetricInput;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub metrics: Vec<MetricInput>,
}

pub async fn ingest_metrics(
    state: web::Data<AppState>,
    request: web::Json<IngestRequest>,
) -> Result<HttpResponse, AnalyticsError> {
    let summary = state.ingest.ingest(request.into_inner().metrics).await?;
    Ok(HttpResponse::Ok().json(summary))
}
