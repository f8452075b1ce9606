use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::OrganizationScope;
use crate::errors::ContactError;
use crate::models::{CreateGroupRequest, GroupListParams, MembershipRequest, UpdateGroupRequest};
use crate::AppState;

pub async fn create_group(
    state: web::Data<AppState>,
    scope: web::Query<OrganizationScope>,
    request: web::Json<CreateGroupRequest>,
) -> Result<HttpResponse, ContactError> {
    let group = state.groups.create(scope.organization_id, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(group))
}

pub async fn list_groups(
    state: web::Data<AppState>,
    query: web::Query<GroupListParams>,
) -> Result<HttpResponse, ContactError> {
    let page = state.groups.list(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_group(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    scope: web::Query<OrganizationScope>,
) -> Result<HttpResponse, ContactError> {
    let group = state.groups.get(scope.organization_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(group))
}

pub async fn update_group(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    scope: web::Query<OrganizationScope>,
    request: web::Json<UpdateGroupRequest>,
) -> Result<HttpResponse, ContactError> {
    let group = state
        .groups
        .update(scope.organization_id, path.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(group))
}

pub async fn delete_group(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    scope: web::Query<OrganizationScope>,
) -> Result<HttpResponse, ContactError> {
    state.groups.delete(scope.organization_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn add_contacts(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    scope: web::Query<OrganizationScope>,
    request: web::Json<MembershipRequest>,
) -> Result<HttpResponse, ContactError> {
    let result = state
        .groups
        .add_contacts(scope.organization_id, path.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn remove_contacts(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    scope: web::Query<OrganizationScope>,
    request: web::Json<MembershipRequest>,
) -> Result<HttpResponse, ContactError> {
    let result = state
        .groups
        .remove_contacts(scope.organization_id, path.into_inner(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}
