use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::errors::ContactError;
use crate::models::{BulkCreateRequest, ContactSearchParams, CreateContactRequest, UpdateContactRequest};
use crate::AppState;

pub async fn create_contact(
    state: web::Data<AppState>,
    request: web::Json<CreateContactRequest>,
) -> Result<HttpResponse, ContactError> {
    let contact = state.contacts.create(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(contact))
}

pub async fn get_contact(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ContactError> {
    let contact = state.contacts.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(contact))
}

pub async fn update_contact(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<UpdateContactRequest>,
) -> Result<HttpResponse, ContactError> {
    let contact = state.contacts.update(path.into_inner(), request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(contact))
}

pub async fn delete_contact(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ContactError> {
    state.contacts.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn search_contacts(
    state: web::Data<AppState>,
    query: web::Query<ContactSearchParams>,
) -> Result<HttpResponse, ContactError> {
    let page = state.contacts.search(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn bulk_create_contacts(
    state: web::Data<AppState>,
    request: web::Json<BulkCreateRequest>,
) -> Result<HttpResponse, ContactError> {
    let result = state.contacts.bulk_create(request.into_inner().contacts).await?;
    Ok(HttpResponse::Created().json(result))
}
