use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use uuid::Uuid;

use super::OrganizationScope;
use crate::errors::ContactError;
use crate::services::import_manager::MAX_IMPORT_FILE_BYTES;
use crate::AppState;

/// Size cap for the optional `field_mapping` part
const MAX_MAPPING_BYTES: usize = 64 * 1024;

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

pub async fn upload(
    state: web::Data<AppState>,
    scope: web::Query<OrganizationScope>,
    mut payload: Multipart,
) -> Result<HttpResponse, ContactError> {
    let mut upload: Option<Upload> = None;
    let mut field_mapping: Option<HashMap<String, String>> = None;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| ContactError::Validation(format!("Multipart error: {}", e)))?;
        let content_disposition = field.content_disposition().cloned();
        let name = content_disposition
            .as_ref()
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();

        match name.as_str() {
            "file" => {
                let file_name = content_disposition
                    .as_ref()
                    .and_then(|cd| cd.get_filename())
                    .map(str::to_string)
                    .ok_or_else(|| ContactError::Validation("No filename provided".to_string()))?;
                let bytes = read_field(&mut field, MAX_IMPORT_FILE_BYTES, "File").await?;
                upload = Some(Upload { file_name, bytes });
            }
            "field_mapping" => {
                let bytes = read_field(&mut field, MAX_MAPPING_BYTES, "field_mapping").await?;
                let mapping = serde_json::from_slice(&bytes).map_err(|e| {
                    ContactError::Validation(format!("field_mapping must be a JSON object of strings: {}", e))
                })?;
                field_mapping = Some(mapping);
            }
            // Unknown parts are drained and ignored
            _ => {
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| ContactError::Validation(format!("Multipart error: {}", e)))?;
                }
            }
        }
    }

    let upload = upload.ok_or_else(|| ContactError::Validation("Missing file part".to_string()))?;
    let accepted = state.imports.start_import(
        scope.organization_id,
        &upload.file_name,
        &upload.bytes,
        field_mapping,
    )?;

    Ok(HttpResponse::Ok().json(accepted))
}

pub async fn status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    scope: web::Query<OrganizationScope>,
) -> Result<HttpResponse, ContactError> {
    let status = state.imports.status(path.into_inner(), scope.organization_id)?;
    Ok(HttpResponse::Ok().json(status))
}

async fn read_field(
    field: &mut actix_multipart::Field,
    limit: usize,
    label: &str,
) -> Result<Vec<u8>, ContactError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| ContactError::Validation(format!("Multipart error: {}", e)))?;
        if bytes.len() + chunk.len() > limit {
            return Err(ContactError::Validation(format!(
                "{} exceeds maximum size of {} bytes",
                label, limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
