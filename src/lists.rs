// src/lists.rs

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use log::{debug, info};

use crate::app_state::AppState;
use crate::auth::Principal;
use crate::authorization::load_owned_list;
use crate::error::ApiError;
use crate::validation;

/// GET /api/lists
/// Lists owned by the caller, newest first.
pub async fn list_lists(
    principal: Principal,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let lists = data.storage.get_lists(principal.id()).await?;
    Ok(HttpResponse::Ok().json(lists))
}

/// POST /api/lists
pub async fn create_list(
    principal: Principal,
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let payload = validation::json_body(req.content_type(), &body)?;
    debug!("create_list from {} with payload: {}", principal, payload);
    let new_list = validation::new_list(&payload)?;
    let list = data.storage.create_list(principal.id(), new_list).await?;
    info!("List {} created by {}", list.id, principal);
    Ok(HttpResponse::Created().json(list))
}

/// GET /api/lists/{id}
pub async fn get_list(
    principal: Principal,
    data: web::Data<AppState>,
    list_id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let list = load_owned_list(data.storage.as_ref(), &principal, *list_id).await?;
    Ok(HttpResponse::Ok().json(list))
}

/// PUT /api/lists/{id}
/// Partial update of name and/or type.
pub async fn update_list(
    principal: Principal,
    data: web::Data<AppState>,
    list_id: web::Path<i64>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let list = load_owned_list(data.storage.as_ref(), &principal, *list_id).await?;
    let payload = validation::json_body(req.content_type(), &body)?;
    let changes = validation::list_changes(&payload)?;
    let updated = data.storage.update_list(list.id, changes).await?;
    info!("List {} updated by {}", updated.id, principal);
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/lists/{id}
/// Removes the list and all of its tasks.
pub async fn delete_list(
    principal: Principal,
    data: web::Data<AppState>,
    list_id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let list = load_owned_list(data.storage.as_ref(), &principal, *list_id).await?;
    data.storage.delete_list(list.id).await?;
    info!("List {} deleted by {}", list.id, principal);
    Ok(HttpResponse::NoContent().finish())
}
