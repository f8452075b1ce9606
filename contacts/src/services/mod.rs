pub mod contact_manager;
pub mod group_manager;
pub mod import_manager;
pub mod validation;

pub use contact_manager::ContactManager;
pub use group_manager::GroupManager;
pub use import_manager::ImportManager;

use std::future::Future;
use std::time::Duration;

use crate::errors::{ContactError, ContactResult};

/// Runs a store call under the database timeout; failures surface as 503s.
pub(crate) async fn with_db_timeout<T, F>(timeout: Duration, operation: &str, fut: F) -> ContactResult<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::error!(operation = operation, error = ?e, "Database operation failed");
            Err(ContactError::Dependency(format!("{} failed", operation)))
        }
        Err(_) => {
            tracing::error!(operation = operation, timeout_ms = timeout.as_millis() as u64, "Database operation timed out");
            Err(ContactError::Dependency(format!("{} timed out", operation)))
        }
    }
}

pub(crate) fn check_page(page: i64, page_size: i64, max_page_size: i64) -> ContactResult<()> {
    if page < 1 {
        return Err(ContactError::Validation("page must be at least 1".to_string()));
    }
    if !(1..=max_page_size).contains(&page_size) {
        return Err(ContactError::Validation(format!(
            "page_size must be between 1 and {}",
            max_page_size
        )));
    }
    Ok(())
}
