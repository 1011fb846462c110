// src/authorization.rs
//
// Owner-only access. Tasks have no owner of their own; access to a task is
// always derived from its parent list. Existence is checked before ownership.

use log::warn;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::models::{List, Task};
use crate::storage::Storage;

pub fn can_access(principal: &Principal, list: &List) -> bool {
    list.owner_id == principal.id()
}

/// Resolves an optional lookup into a list the principal owns.
pub fn owned_list(principal: &Principal, list: Option<List>) -> Result<List, ApiError> {
    let list = list.ok_or(ApiError::NotFound("List"))?;
    if !can_access(principal, &list) {
        warn!("User {} denied access to list {}", principal, list.id);
        return Err(ApiError::Forbidden);
    }
    Ok(list)
}

pub async fn load_owned_list(
    storage: &dyn Storage,
    principal: &Principal,
    list_id: i64,
) -> Result<List, ApiError> {
    owned_list(principal, storage.get_list(list_id).await?)
}

pub async fn load_owned_task(
    storage: &dyn Storage,
    principal: &Principal,
    task_id: i64,
) -> Result<Task, ApiError> {
    let task = storage
        .get_task(task_id)
        .await?
        .ok_or(ApiError::NotFound("Task"))?;
    // A task whose list vanished is treated like a missing task.
    match storage.get_list(task.list_id).await? {
        Some(list) => {
            owned_list(principal, Some(list))?;
            Ok(task)
        }
        None => Err(ApiError::NotFound("Task")),
    }
}
