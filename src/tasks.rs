// src/tasks.rs

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use log::{debug, info};

use crate::app_state::AppState;
use crate::auth::Principal;
use crate::authorization::{load_owned_list, load_owned_task};
use crate::error::ApiError;
use crate::validation;

/// GET /api/lists/{list_id}/tasks
pub async fn list_tasks(
    principal: Principal,
    data: web::Data<AppState>,
    list_id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let list = load_owned_list(data.storage.as_ref(), &principal, *list_id).await?;
    let tasks = data.storage.get_tasks(list.id).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// POST /api/lists/{list_id}/tasks
/// The task's list always comes from the path, never from the body.
pub async fn create_task(
    principal: Principal,
    data: web::Data<AppState>,
    list_id: web::Path<i64>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let list = load_owned_list(data.storage.as_ref(), &principal, *list_id).await?;
    let payload = validation::json_body(req.content_type(), &body)?;
    debug!("create_task in list {} with payload: {}", list.id, payload);
    let new_task = validation::new_task(&payload)?;
    let task = data.storage.create_task(list.id, new_task).await?;
    info!("Task {} created in list {} by {}", task.id, list.id, principal);
    Ok(HttpResponse::Created().json(task))
}

/// PUT /api/tasks/{id}
///
/// With `strict_task_ownership` the parent list must exist and belong to the
/// caller. Without it, any authenticated caller may update any task by id.
pub async fn update_task(
    principal: Principal,
    data: web::Data<AppState>,
    task_id: web::Path<i64>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let task_id = task_id.into_inner();
    if data.config.strict_task_ownership {
        load_owned_task(data.storage.as_ref(), &principal, task_id).await?;
    }
    let payload = validation::json_body(req.content_type(), &body)?;
    let changes = validation::task_changes(&payload)?;
    let task = data.storage.update_task(task_id, changes).await?;
    info!("Task {} updated by {}", task.id, principal);
    Ok(HttpResponse::Ok().json(task))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    principal: Principal,
    data: web::Data<AppState>,
    task_id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let task_id = task_id.into_inner();
    if data.config.strict_task_ownership {
        load_owned_task(data.storage.as_ref(), &principal, task_id).await?;
    }
    if !data.storage.delete_task(task_id).await? {
        return Err(ApiError::NotFound("Task"));
    }
    info!("Task {} deleted by {}", task_id, principal);
    Ok(HttpResponse::NoContent().finish())
}
