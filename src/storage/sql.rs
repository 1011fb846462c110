// src/storage/sql.rs
//
// Relational backend over a pooled SQLite database. Tasks reference their list
// through a cascading foreign key; timestamps are stored as microseconds since
// the epoch so that ordering by them is exact.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};

use super::{from_micros, Storage, StorageError, StorageResult};
use crate::models::{List, ListChanges, NewList, NewTask, Task, TaskChanges};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS lists (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id    TEXT    NOT NULL,
    name        TEXT    NOT NULL,
    list_type   TEXT,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_lists_owner ON lists (owner_id, created_at DESC);

CREATE TABLE IF NOT EXISTS tasks (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    list_id       INTEGER NOT NULL REFERENCES lists (id) ON DELETE CASCADE,
    text          TEXT    NOT NULL,
    is_completed  INTEGER NOT NULL DEFAULT 0,
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_list ON tasks (list_id, created_at DESC);
"#;

const LIST_COLUMNS: &str = "id, owner_id, name, list_type, created_at, updated_at";
const TASK_COLUMNS: &str = "id, list_id, text, is_completed, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ListRow {
    id: i64,
    owner_id: String,
    name: String,
    list_type: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ListRow> for List {
    type Error = StorageError;

    fn try_from(row: ListRow) -> StorageResult<Self> {
        Ok(List {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            list_type: row.list_type,
            created_at: from_micros(row.created_at)?,
            updated_at: from_micros(row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    list_id: i64,
    text: String,
    is_completed: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<TaskRow> for Task {
    type Error = StorageError;

    fn try_from(row: TaskRow) -> StorageResult<Self> {
        Ok(Task {
            id: row.id,
            list_id: row.list_id,
            text: row.text,
            is_completed: row.is_completed,
            created_at: from_micros(row.created_at)?,
            updated_at: from_micros(row.updated_at)?,
        })
    }
}

pub struct SqlStorage {
    pool: SqlitePool,
}

impl SqlStorage {
    pub async fn connect(url: &str, max_connections: u32) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database sees its own empty database,
        // so those get exactly one connection that is never recycled.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// Wraps an existing pool, creating the schema if needed.
    pub async fn from_pool(pool: SqlitePool) -> StorageResult<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn in_memory() -> Self {
        Self::connect("sqlite::memory:", 1)
            .await
            .expect("in-memory sqlite should open")
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

#[async_trait]
impl Storage for SqlStorage {
    async fn get_lists(&self, owner_id: &str) -> StorageResult<Vec<List>> {
        let rows = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {LIST_COLUMNS} FROM lists WHERE owner_id = ? ORDER BY created_at DESC, id ASC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(List::try_from).collect()
    }

    async fn get_list(&self, id: i64) -> StorageResult<Option<List>> {
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {LIST_COLUMNS} FROM lists WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(List::try_from).transpose()
    }

    async fn create_list(&self, owner_id: &str, list: NewList) -> StorageResult<List> {
        let now = now_micros();
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "INSERT INTO lists (owner_id, name, list_type, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {LIST_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(list.name)
        .bind(list.list_type)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        List::try_from(row)
    }

    async fn update_list(&self, id: i64, changes: ListChanges) -> StorageResult<List> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE lists SET updated_at = ");
        query.push_bind(now_micros());
        if let Some(name) = changes.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(list_type) = changes.list_type {
            query.push(", list_type = ").push_bind(list_type);
        }
        query.push(" WHERE id = ").push_bind(id);
        query.push(format!(" RETURNING {LIST_COLUMNS}"));

        let row = query
            .build_query_as::<ListRow>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound("List"))?;
        List::try_from(row)
    }

    async fn delete_list(&self, id: i64) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        let tasks = sqlx::query("DELETE FROM tasks WHERE list_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM lists WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!("Deleted list {} and {} task(s)", id, tasks.rows_affected());
        Ok(())
    }

    async fn get_tasks(&self, list_id: i64) -> StorageResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE list_id = ? ORDER BY created_at DESC, id ASC"
        ))
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn get_task(&self, id: i64) -> StorageResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Task::try_from).transpose()
    }

    async fn create_task(&self, list_id: i64, task: NewTask) -> StorageResult<Task> {
        let now = now_micros();
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "INSERT INTO tasks (list_id, text, is_completed, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {TASK_COLUMNS}"
        ))
        .bind(list_id)
        .bind(task.text)
        .bind(task.is_completed)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let missing_list = e
                .as_database_error()
                .is_some_and(|db| db.is_foreign_key_violation());
            if missing_list {
                StorageError::NotFound("List")
            } else {
                StorageError::from(e)
            }
        })?;
        Task::try_from(row)
    }

    async fn update_task(&self, id: i64, changes: TaskChanges) -> StorageResult<Task> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE tasks SET updated_at = ");
        query.push_bind(now_micros());
        if let Some(text) = changes.text {
            query.push(", text = ").push_bind(text);
        }
        if let Some(is_completed) = changes.is_completed {
            query.push(", is_completed = ").push_bind(is_completed);
        }
        query.push(" WHERE id = ").push_bind(id);
        query.push(format!(" RETURNING {TASK_COLUMNS}"));

        let row = query
            .build_query_as::<TaskRow>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound("Task"))?;
        Task::try_from(row)
    }

    async fn delete_task(&self, id: i64) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groceries() -> NewList {
        NewList {
            name: "Groceries".to_string(),
            list_type: Some("personal".to_string()),
        }
    }

    fn milk() -> NewTask {
        NewTask {
            text: "Milk".to_string(),
            is_completed: false,
        }
    }

    #[tokio::test]
    async fn create_list_assigns_id_and_timestamps() {
        let storage = SqlStorage::in_memory().await;
        let list = storage.create_list("user-a", groceries()).await.unwrap();

        assert_eq!(list.id, 1);
        assert_eq!(list.owner_id, "user-a");
        assert_eq!(list.list_type.as_deref(), Some("personal"));
        assert_eq!(list.created_at, list.updated_at);
        assert_eq!(storage.get_list(list.id).await.unwrap(), Some(list));
    }

    #[tokio::test]
    async fn get_list_reports_absence_as_none() {
        let storage = SqlStorage::in_memory().await;
        assert_eq!(storage.get_list(404).await.unwrap(), None);
    }

    #[tokio::test]
    async fn lists_are_scoped_to_owner_and_newest_first() {
        let storage = SqlStorage::in_memory().await;
        let mut ids = Vec::new();
        for name in ["first", "second", "third"] {
            let list = NewList {
                name: name.to_string(),
                list_type: None,
            };
            ids.push(storage.create_list("user-a", list).await.unwrap().id);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        storage.create_list("user-b", groceries()).await.unwrap();

        let listed: Vec<i64> = storage
            .get_lists("user-a")
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        ids.reverse();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn equal_timestamps_fall_back_to_ascending_id() {
        let storage = SqlStorage::in_memory().await;
        let list = storage.create_list("user-a", groceries()).await.unwrap();
        for text in ["a", "b", "c"] {
            sqlx::query(
                "INSERT INTO tasks (list_id, text, is_completed, created_at, updated_at) \
                 VALUES (?, ?, 0, 1000, 1000)",
            )
            .bind(list.id)
            .bind(text)
            .execute(storage.pool())
            .await
            .unwrap();
        }

        let texts: Vec<String> = storage
            .get_tasks(list.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn partial_list_update_keeps_untouched_fields() {
        let storage = SqlStorage::in_memory().await;
        let list = storage.create_list("user-a", groceries()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        let updated = storage
            .update_list(
                list.id,
                ListChanges {
                    name: None,
                    list_type: Some(Some("work".to_string())),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Groceries");
        assert_eq!(updated.list_type.as_deref(), Some("work"));
        assert_eq!(updated.created_at, list.created_at);
        assert!(updated.updated_at > list.updated_at);
    }

    #[tokio::test]
    async fn explicit_null_clears_list_type() {
        let storage = SqlStorage::in_memory().await;
        let list = storage.create_list("user-a", groceries()).await.unwrap();
        let updated = storage
            .update_list(
                list.id,
                ListChanges {
                    name: None,
                    list_type: Some(None),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.list_type, None);
    }

    #[tokio::test]
    async fn updating_missing_rows_is_not_found() {
        let storage = SqlStorage::in_memory().await;
        let err = storage
            .update_list(9, ListChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound("List")));

        let err = storage
            .update_task(9, TaskChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound("Task")));
    }

    #[tokio::test]
    async fn delete_list_removes_its_tasks() {
        let storage = SqlStorage::in_memory().await;
        let list = storage.create_list("user-a", groceries()).await.unwrap();
        let other = storage.create_list("user-a", groceries()).await.unwrap();
        let mut task_ids = Vec::new();
        for _ in 0..3 {
            task_ids.push(storage.create_task(list.id, milk()).await.unwrap().id);
        }
        let survivor = storage.create_task(other.id, milk()).await.unwrap();

        storage.delete_list(list.id).await.unwrap();

        assert_eq!(storage.get_list(list.id).await.unwrap(), None);
        for id in task_ids {
            assert_eq!(storage.get_task(id).await.unwrap(), None);
        }
        assert_eq!(storage.get_task(survivor.id).await.unwrap(), Some(survivor));
    }

    #[tokio::test]
    async fn foreign_key_cascades_on_raw_list_delete() {
        let storage = SqlStorage::in_memory().await;
        let list = storage.create_list("user-a", groceries()).await.unwrap();
        let task = storage.create_task(list.id, milk()).await.unwrap();

        sqlx::query("DELETE FROM lists WHERE id = ?")
            .bind(list.id)
            .execute(storage.pool())
            .await
            .unwrap();

        assert_eq!(storage.get_task(task.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn tasks_cannot_reference_a_missing_list() {
        let storage = SqlStorage::in_memory().await;
        let err = storage.create_task(77, milk()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound("List")));
        assert!(storage.get_tasks(77).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn task_update_applies_only_supplied_fields() {
        let storage = SqlStorage::in_memory().await;
        let list = storage.create_list("user-a", groceries()).await.unwrap();
        let task = storage.create_task(list.id, milk()).await.unwrap();
        assert!(!task.is_completed);

        let updated = storage
            .update_task(
                task.id,
                TaskChanges {
                    text: None,
                    is_completed: Some(true),
                },
            )
            .await
            .unwrap();
        assert!(updated.is_completed);
        assert_eq!(updated.text, "Milk");
        assert_eq!(updated.list_id, list.id);
    }

    #[tokio::test]
    async fn delete_task_reports_whether_anything_was_removed() {
        let storage = SqlStorage::in_memory().await;
        let list = storage.create_list("user-a", groceries()).await.unwrap();
        let task = storage.create_task(list.id, milk()).await.unwrap();

        assert!(storage.delete_task(task.id).await.unwrap());
        assert!(!storage.delete_task(task.id).await.unwrap());
        assert!(storage.get_tasks(list.id).await.unwrap().is_empty());
    }
}
