pub mod contacts;
pub mod groups;
pub mod health;
pub mod import;

use actix_web::{web, HttpRequest};

use crate::errors::ContactError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .route("/health", web::get().to(health::health_check))
        .service(
            // Literal segments must be registered before `/{id}`
            web::scope("/contacts")
                .route("", web::post().to(contacts::create_contact))
                .route("/search", web::get().to(contacts::search_contacts))
                .route("/bulk", web::post().to(contacts::bulk_create_contacts))
                .route("/{id}", web::get().to(contacts::get_contact))
                .route("/{id}", web::put().to(contacts::update_contact))
                .route("/{id}", web::delete().to(contacts::delete_contact)),
        )
        .service(
            web::scope("/groups")
                .route("", web::post().to(groups::create_group))
                .route("", web::get().to(groups::list_groups))
                .route("/{id}", web::get().to(groups::get_group))
                .route("/{id}", web::put().to(groups::update_group))
                .route("/{id}", web::delete().to(groups::delete_group))
                .route("/{id}/contacts", web::post().to(groups::add_contacts))
                .route("/{id}/contacts", web::delete().to(groups::remove_contacts)),
        )
        .service(
            web::scope("/import")
                .route("/upload", web::post().to(import::upload))
                .route("/status/{import_id}", web::get().to(import::status)),
        );
}

/// Malformed JSON bodies become validation errors instead of actix's plain-text 400
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(4 * 1024 * 1024)
        .error_handler(|err, _req: &HttpRequest| ContactError::Validation(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req: &HttpRequest| ContactError::Validation(err.to_string()).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req: &HttpRequest| ContactError::Validation(err.to_string()).into())
}

/// `?organization_id=` scoping used by group and import routes
#[derive(Debug, serde::Deserialize)]
pub struct OrganizationScope {
    pub organization_id: uuid::Uuid,
}
