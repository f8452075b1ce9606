use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use courier_observability::log_import_finished;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::errors::{ContactError, ContactResult};
use crate::models::{
    CreateContactRequest, ImportAccepted, ImportFileType, ImportProgress, ImportRowError, ImportStatus,
    ImportStatusResponse,
};
use crate::services::validation::split_tags;
use crate::services::ContactManager;
use crate::SERVICE_NAME;

pub const MAX_IMPORT_FILE_BYTES: usize = 16 * 1024 * 1024;
pub const MAX_CONCURRENT_IMPORTS: usize = 10;
pub const IMPORT_BATCH_SIZE: usize = 1000;

/// Contact fields an import column can be mapped onto
pub const IMPORT_FIELDS: [&str; 5] = ["phone_number", "first_name", "last_name", "email", "tags"];

/// Finished imports are kept this long for status polling
const FINISHED_RETENTION_HOURS: i64 = 24;

type Record = BTreeMap<String, String>;

/// Accepts contact files and creates their rows in a background task
#[derive(Clone)]
pub struct ImportManager {
    contacts: ContactManager,
    registry: Arc<DashMap<Uuid, ImportProgress>>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ImportManager {
    pub fn new(contacts: ContactManager) -> Self {
        Self::with_concurrency(contacts, MAX_CONCURRENT_IMPORTS)
    }

    pub fn with_concurrency(contacts: ContactManager, max_concurrent: usize) -> Self {
        Self {
            contacts,
            registry: Arc::new(DashMap::new()),
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Parses the file up front so structural errors are reported to the
    /// uploader; row-level failures are only visible through `status`.
    pub fn start_import(
        &self,
        organization_id: Uuid,
        file_name: &str,
        bytes: &[u8],
        field_mapping: Option<HashMap<String, String>>,
    ) -> ContactResult<ImportAccepted> {
        let file_type = ImportFileType::from_file_name(file_name).ok_or_else(|| {
            ContactError::Validation(format!(
                "Unsupported file type: {}. Allowed types: csv, json",
                file_name
            ))
        })?;
        if bytes.is_empty() {
            return Err(ContactError::Validation("File is empty".to_string()));
        }
        if bytes.len() > MAX_IMPORT_FILE_BYTES {
            return Err(ContactError::Validation(format!(
                "File exceeds maximum size of {} bytes",
                MAX_IMPORT_FILE_BYTES
            )));
        }

        let mapping = resolve_mapping(field_mapping)?;
        let records = parse_records(file_type, bytes)?;
        if records.is_empty() {
            return Err(ContactError::Validation(
                "Invalid file structure: no records found".to_string(),
            ));
        }

        let permit = self.permits.clone().try_acquire_owned().map_err(|_| {
            ContactError::Dependency("Too many imports in progress, try again later".to_string())
        })?;

        self.prune_finished();

        let import_id = Uuid::new_v4();
        self.registry
            .insert(import_id, ImportProgress::new(import_id, organization_id, records.len()));

        tracing::info!(
            import_id = %import_id,
            organization_id = %organization_id,
            file_type = %file_type,
            records = records.len(),
            "Contact import accepted"
        );

        let manager = self.clone();
        tokio::spawn(async move {
            manager.run(import_id, organization_id, records, mapping, permit).await;
        });

        Ok(ImportAccepted {
            import_id,
            status: "processing".to_string(),
            status_url: format!("/import/status/{}?organization_id={}", import_id, organization_id),
            organization_id,
            file_name: file_name.to_string(),
            file_size: bytes.len(),
        })
    }

    pub fn status(&self, import_id: Uuid, organization_id: Uuid) -> ContactResult<ImportStatusResponse> {
        let progress = self
            .registry
            .get(&import_id)
            .map(|p| p.clone())
            .ok_or_else(|| ContactError::NotFound(format!("Import not found: {}", import_id)))?;

        if progress.organization_id != organization_id {
            return Err(ContactError::Forbidden(
                "Import belongs to another organization".to_string(),
            ));
        }
        Ok(ImportStatusResponse::from(&progress))
    }

    pub fn active_imports(&self) -> usize {
        self.max_concurrent.saturating_sub(self.permits.available_permits())
    }

    async fn run(
        &self,
        import_id: Uuid,
        organization_id: Uuid,
        records: Vec<Record>,
        mapping: HashMap<String, String>,
        _permit: OwnedSemaphorePermit,
    ) {
        self.update(import_id, |p| p.status = ImportStatus::InProgress);

        let mut failure = None;
        for (batch_index, batch) in records.chunks(IMPORT_BATCH_SIZE).enumerate() {
            let mut succeeded = 0;
            let mut errors = Vec::new();

            for (offset, record) in batch.iter().enumerate() {
                let row = batch_index * IMPORT_BATCH_SIZE + offset + 1;
                let outcome = match map_record(organization_id, record, &mapping) {
                    Ok(request) => self.contacts.create(request).await.map(|_| ()),
                    Err(e) => Err(e),
                };

                match outcome {
                    Ok(()) => succeeded += 1,
                    Err(ContactError::Dependency(message)) => {
                        failure = Some(message);
                        break;
                    }
                    Err(e) => errors.push(ImportRowError {
                        row,
                        error: e.to_string(),
                        data: record.clone(),
                    }),
                }
            }

            let processed = succeeded + errors.len();
            self.update(import_id, |p| {
                p.processed += processed;
                p.success_count += succeeded;
                p.error_count += errors.len();
                p.errors.append(&mut errors);
                p.update_percentage();
            });

            if failure.is_some() {
                break;
            }
        }

        let status = if failure.is_some() {
            ImportStatus::Failed
        } else {
            ImportStatus::Completed
        };
        let mut finished = None;
        self.update(import_id, |p| {
            p.status = status;
            p.completed_at = Some(Utc::now());
            finished = Some((p.success_count, p.error_count));
        });

        let (success_count, error_count) = finished.unwrap_or_default();
        log_import_finished(
            SERVICE_NAME,
            &organization_id.to_string(),
            &import_id.to_string(),
            success_count,
            error_count,
            failure.as_deref(),
        );
    }

    fn update(&self, import_id: Uuid, apply: impl FnOnce(&mut ImportProgress)) {
        if let Some(mut progress) = self.registry.get_mut(&import_id) {
            apply(&mut progress);
        }
    }

    fn prune_finished(&self) {
        let cutoff = Utc::now() - ChronoDuration::hours(FINISHED_RETENTION_HOURS);
        self.registry
            .retain(|_, p| p.completed_at.map_or(true, |done| done > cutoff));
    }
}

/// Column → contact field. Without a mapping, columns named after a field map to it.
fn resolve_mapping(field_mapping: Option<HashMap<String, String>>) -> ContactResult<HashMap<String, String>> {
    let Some(mapping) = field_mapping else {
        return Ok(IMPORT_FIELDS
            .iter()
            .map(|f| (f.to_string(), f.to_string()))
            .collect());
    };

    for target in mapping.values() {
        if !IMPORT_FIELDS.contains(&target.as_str()) {
            return Err(ContactError::Validation(format!(
                "Unknown contact field in field_mapping: {}",
                target
            )));
        }
    }
    Ok(mapping)
}

fn parse_records(file_type: ImportFileType, bytes: &[u8]) -> ContactResult<Vec<Record>> {
    match file_type {
        ImportFileType::Csv => parse_csv(bytes),
        ImportFileType::Json => parse_json(bytes),
    }
}

fn parse_csv(bytes: &[u8]) -> ContactResult<Vec<Record>> {
    let structure = |e: csv::Error| ContactError::Validation(format!("Invalid file structure: {}", e));

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers = reader.headers().map_err(structure)?.clone();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(structure)?;
        records.push(
            headers
                .iter()
                .zip(record.iter())
                .filter(|(_, value)| !value.is_empty())
                .map(|(header, value)| (header.to_string(), value.to_string()))
                .collect(),
        );
    }
    Ok(records)
}

fn parse_json(bytes: &[u8]) -> ContactResult<Vec<Record>> {
    let structure = |detail: String| ContactError::Validation(format!("Invalid file structure: {}", detail));

    let value: Value = serde_json::from_slice(bytes).map_err(|e| structure(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(structure("expected an array of objects".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => Ok(fields
                .into_iter()
                .filter_map(|(key, value)| cell_text(value).map(|text| (key, text)))
                .collect()),
            _ => Err(structure(format!("record {} is not an object", index + 1))),
        })
        .collect()
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(cell_text).collect();
            (!parts.is_empty()).then(|| parts.join(";"))
        }
        other => Some(other.to_string()),
    }
}

fn map_record(
    organization_id: Uuid,
    record: &Record,
    mapping: &HashMap<String, String>,
) -> ContactResult<CreateContactRequest> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for (column, target) in mapping {
        if let Some(value) = record.get(column) {
            fields.insert(target.as_str(), value.as_str());
        }
    }

    let required = |name: &str| {
        fields
            .get(name)
            .map(|v| v.to_string())
            .ok_or_else(|| ContactError::Validation(format!("Missing required field: {}", name)))
    };

    Ok(CreateContactRequest {
        organization_id,
        phone_number: required("phone_number")?,
        first_name: required("first_name")?,
        last_name: required("last_name")?,
        email: fields.get("email").map(|v| v.to_string()),
        metadata: None,
        tags: fields.get("tags").map(|v| split_tags(v)).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_config::ServiceSettings;
    use courier_database::repositories::MemoryStore;
    use courier_database::{CacheStore, MemoryCache, TimedCache};
    use std::time::Duration;

    fn manager() -> ImportManager {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::default());
        let contacts = ContactManager::new(
            Arc::new(MemoryStore::new()),
            TimedCache::new(cache, Duration::from_millis(500)),
            &ServiceSettings::with_defaults("contact-service", 3021),
        );
        ImportManager::new(contacts)
    }

    async fn wait_for_finish(manager: &ImportManager, import_id: Uuid, org: Uuid) -> ImportStatusResponse {
        for _ in 0..200 {
            let status = manager.status(import_id, org).unwrap();
            if matches!(status.status, ImportStatus::Completed | ImportStatus::Failed) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("import {} did not finish", import_id);
    }

    #[tokio::test]
    async fn test_csv_import_counts_rows() {
        let manager = manager();
        let org = Uuid::new_v4();
        let csv = "phone_number,first_name,last_name,email,tags\n\
                   +14155550100,Ada,Lovelace,ada@example.com,vip;lead\n\
                   not-a-phone,Bad,Row,,\n\
                   +14155550101,Grace,,,\n\
                   +14155550100,Dup,Licate,,\n\
                   +442079460958,Alan,Turing,,\n";

        let accepted = manager.start_import(org, "contacts.CSV", csv.as_bytes(), None).unwrap();
        assert_eq!(accepted.status, "processing");
        assert_eq!(accepted.file_size, csv.len());

        let status = wait_for_finish(&manager, accepted.import_id, org).await;
        assert_eq!(status.status, ImportStatus::Completed);
        assert_eq!(status.progress.total_records, 5);
        assert_eq!(status.progress.processed_records, 5);
        assert_eq!(status.progress.success_count, 2);
        assert_eq!(status.progress.error_count, 3);
        assert_eq!(status.progress.percentage, 100.0);

        let rows: Vec<usize> = status.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![2, 3, 4]);
        assert!(status.errors[1].error.contains("last_name"));
        assert_eq!(status.errors[0].data.get("first_name").map(String::as_str), Some("Bad"));
        assert!(!status.has_more_errors);
    }

    #[tokio::test]
    async fn test_json_import_with_field_mapping() {
        let manager = manager();
        let org = Uuid::new_v4();
        let json = serde_json::json!([
            {"mobile": "+14155550102", "given": "Ada", "family": "Lovelace", "labels": ["a", "b"]},
            {"mobile": 4155550103i64, "given": "No", "family": "Plus"},
            {"mobile": null, "given": "Missing", "family": "Phone"}
        ])
        .to_string();
        let mapping: HashMap<String, String> = [
            ("mobile", "phone_number"),
            ("given", "first_name"),
            ("family", "last_name"),
            ("labels", "tags"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let accepted = manager
            .start_import(org, "contacts.json", json.as_bytes(), Some(mapping))
            .unwrap();
        let status = wait_for_finish(&manager, accepted.import_id, org).await;

        assert_eq!(status.progress.success_count, 1);
        assert_eq!(status.progress.error_count, 2);
        assert!(status.errors[0].error.contains("Invalid phone number"));
        assert!(status.errors[1].error.contains("Missing required field: phone_number"));
    }

    #[tokio::test]
    async fn test_status_is_scoped_to_organization() {
        let manager = manager();
        let org = Uuid::new_v4();
        let csv = "phone_number,first_name,last_name\n+14155550104,Ada,Lovelace\n";
        let accepted = manager.start_import(org, "c.csv", csv.as_bytes(), None).unwrap();

        assert!(matches!(
            manager.status(accepted.import_id, Uuid::new_v4()),
            Err(ContactError::Forbidden(_))
        ));
        assert!(matches!(
            manager.status(Uuid::new_v4(), org),
            Err(ContactError::NotFound(_))
        ));
        wait_for_finish(&manager, accepted.import_id, org).await;
    }

    #[test]
    fn test_rejected_uploads() {
        let org = Uuid::new_v4();
        let manager = manager();

        let err = manager.start_import(org, "contacts.xlsx", b"x", None).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));

        let err = manager.start_import(org, "contacts.json", b"{\"a\": 1}", None).unwrap_err();
        assert!(err.to_string().starts_with("Invalid file structure"));

        let err = manager.start_import(org, "contacts.csv", b"a,b\n1,2,3\n", None).unwrap_err();
        assert!(err.to_string().starts_with("Invalid file structure"));

        let mapping = HashMap::from([("col".to_string(), "nickname".to_string())]);
        let err = manager
            .start_import(org, "contacts.csv", b"col\nx\n", Some(mapping))
            .unwrap_err();
        assert!(err.to_string().contains("nickname"));

        let oversized = vec![b'a'; MAX_IMPORT_FILE_BYTES + 1];
        assert!(manager.start_import(org, "big.csv", &oversized, None).is_err());
    }

    #[tokio::test]
    async fn test_concurrency_limit() {
        let manager = ImportManager::with_concurrency(manager().contacts.clone(), 0);
        let err = manager
            .start_import(Uuid::new_v4(), "c.csv", b"phone_number\n+14155550105\n", None)
            .unwrap_err();
        assert!(matches!(err, ContactError::Dependency(_)));
    }
}
