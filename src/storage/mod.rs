// src/storage/mod.rs

mod mongo;
mod sql;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use thiserror::Error;

use crate::config::Config;
use crate::models::{List, ListChanges, NewList, NewTask, Task, TaskChanges};

pub use mongo::MongoStorage;
pub use sql::SqlStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// CRUD access to lists and their tasks.
///
/// Listings are ordered newest `created_at` first, ties broken by ascending id.
/// Update and delete do not check ownership; callers must authorize first.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_lists(&self, owner_id: &str) -> StorageResult<Vec<List>>;
    async fn get_list(&self, id: i64) -> StorageResult<Option<List>>;
    async fn create_list(&self, owner_id: &str, list: NewList) -> StorageResult<List>;
    /// Fails with [`StorageError::NotFound`] when no list has this id.
    async fn update_list(&self, id: i64, changes: ListChanges) -> StorageResult<List>;
    /// Removes the list together with every task that references it.
    async fn delete_list(&self, id: i64) -> StorageResult<()>;

    async fn get_tasks(&self, list_id: i64) -> StorageResult<Vec<Task>>;
    async fn get_task(&self, id: i64) -> StorageResult<Option<Task>>;
    async fn create_task(&self, list_id: i64, task: NewTask) -> StorageResult<Task>;
    /// Fails with [`StorageError::NotFound`] when no task has this id.
    async fn update_task(&self, id: i64, changes: TaskChanges) -> StorageResult<Task>;
    /// Returns whether a task was removed.
    async fn delete_task(&self, id: i64) -> StorageResult<bool>;
}

/// Opens the backend selected by `DATABASE_URL`.
pub async fn connect(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    if config.uses_mongodb() {
        info!("Using MongoDB database {}", config.database_name);
        let storage: Arc<dyn Storage> =
            Arc::new(MongoStorage::init(&config.database_url, &config.database_name).await?);
        Ok(storage)
    } else {
        info!("Using SQL database at {}", config.database_url);
        let storage: Arc<dyn Storage> =
            Arc::new(SqlStorage::connect(&config.database_url, config.max_connections).await?);
        Ok(storage)
    }
}

fn from_micros(micros: i64) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StorageError::Corrupt(format!("timestamp out of range: {micros}")))
}

fn from_millis(millis: i64) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::Corrupt(format!("timestamp out of range: {millis}")))
}
