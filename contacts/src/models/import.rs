use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors returned by the status endpoint
pub const STATUS_ERROR_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFileType {
    Csv,
    Json,
}

impl ImportFileType {
    /// Detects the type from the file extension, case-insensitively
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for ImportFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportRowError {
    /// 1-based record number within the file
    pub row: usize,
    pub error: String,
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportProgress {
    pub import_id: Uuid,
    pub organization_id: Uuid,
    pub status: ImportStatus,
    pub total_records: usize,
    pub processed: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub percentage: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub errors: Vec<ImportRowError>,
}

impl ImportProgress {
    pub fn new(import_id: Uuid, organization_id: Uuid, total_records: usize) -> Self {
        Self {
            import_id,
            organization_id,
            status: ImportStatus::Pending,
            total_records,
            processed: 0,
            success_count: 0,
            error_count: 0,
            percentage: 0.0,
            started_at: Utc::now(),
            completed_at: None,
            errors: Vec::new(),
        }
    }

    pub fn update_percentage(&mut self) {
        self.percentage = if self.total_records == 0 {
            100.0
        } else {
            (self.processed as f64 / self.total_records as f64 * 10000.0).round() / 100.0
        };
    }
}

/// Response of a successful upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportAccepted {
    pub import_id: Uuid,
    pub status: String,
    pub status_url: String,
    pub organization_id: Uuid,
    pub file_name: String,
    pub file_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportCounts {
    pub total_records: usize,
    pub processed_records: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportStatusResponse {
    pub import_id: Uuid,
    pub status: ImportStatus,
    pub organization_id: Uuid,
    pub progress: ImportCounts,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub errors: Vec<ImportRowError>,
    pub has_more_errors: bool,
}

impl From<&ImportProgress> for ImportStatusResponse {
    fn from(progress: &ImportProgress) -> Self {
        Self {
            import_id: progress.import_id,
            status: progress.status,
            organization_id: progress.organization_id,
            progress: ImportCounts {
                total_records: progress.total_records,
                processed_records: progress.processed,
                success_count: progress.success_count,
                error_count: progress.error_count,
                percentage: progress.percentage,
            },
            started_at: progress.started_at,
            completed_at: progress.completed_at,
            errors: progress.errors.iter().take(STATUS_ERROR_LIMIT).cloned().collect(),
            has_more_errors: progress.errors.len() > STATUS_ERROR_LIMIT,
        }
    }
}
