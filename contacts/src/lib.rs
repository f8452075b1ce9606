//! Contact service: contacts, groups with capped membership, and
//! background CSV/JSON imports.

pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;

use std::sync::Arc;

use courier_config::ServiceSettings;
use courier_database::repositories::{ContactStore, GroupStore};
use courier_database::TimedCache;

use services::{ContactManager, GroupManager, ImportManager};

pub const SERVICE_NAME: &str = "contact-service";
pub const DEFAULT_PORT: u16 = 3021;

#[derive(Clone)]
pub struct AppState {
    pub contacts: ContactManager,
    pub groups: GroupManager,
    pub imports: ImportManager,
    pub cache: TimedCache,
}

impl AppState {
    pub fn new(
        contacts: Arc<dyn ContactStore>,
        groups: Arc<dyn GroupStore>,
        cache: TimedCache,
        settings: &ServiceSettings,
    ) -> Self {
        let contact_manager = ContactManager::new(contacts.clone(), cache.clone(), settings);
        Self {
            groups: GroupManager::new(groups, contacts, cache.clone(), settings),
            imports: ImportManager::new(contact_manager.clone()),
            contacts: contact_manager,
            cache,
        }
    }
}
