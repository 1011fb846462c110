// src/storage/mongo.rs
//
// Document backend. Integer ids come from a `counters` collection and list
// deletion removes the tasks in the same transaction, which needs a replica
// set (or sharded) deployment.

use async_trait::async_trait;
use chrono::Utc;
use futures_util::TryStreamExt;
use log::debug;
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::options::{ClientOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use super::{from_millis, Storage, StorageError, StorageResult};
use crate::models::{List, ListChanges, NewList, NewTask, Task, TaskChanges};

#[derive(Debug, Serialize, Deserialize)]
struct ListDocument {
    #[serde(rename = "_id")]
    id: i64,
    owner_id: String,
    name: String,
    list_type: Option<String>,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl TryFrom<ListDocument> for List {
    type Error = StorageError;

    fn try_from(doc: ListDocument) -> StorageResult<Self> {
        Ok(List {
            id: doc.id,
            owner_id: doc.owner_id,
            name: doc.name,
            list_type: doc.list_type,
            created_at: from_millis(doc.created_at.timestamp_millis())?,
            updated_at: from_millis(doc.updated_at.timestamp_millis())?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TaskDocument {
    #[serde(rename = "_id")]
    id: i64,
    list_id: i64,
    text: String,
    is_completed: bool,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl TryFrom<TaskDocument> for Task {
    type Error = StorageError;

    fn try_from(doc: TaskDocument) -> StorageResult<Self> {
        Ok(Task {
            id: doc.id,
            list_id: doc.list_id,
            text: doc.text,
            is_completed: doc.is_completed,
            created_at: from_millis(doc.created_at.timestamp_millis())?,
            updated_at: from_millis(doc.updated_at.timestamp_millis())?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Counter {
    seq: i64,
}

pub struct MongoStorage {
    client: Client,
    db: Database,
}

impl MongoStorage {
    pub async fn init(uri: &str, db_name: &str) -> StorageResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        let storage = MongoStorage { client, db };
        storage.ensure_indexes().await?;
        Ok(storage)
    }

    async fn ensure_indexes(&self) -> StorageResult<()> {
        self.lists()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "owner_id": 1, "created_at": -1, "_id": 1 })
                    .build(),
            )
            .await?;
        self.tasks()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "list_id": 1, "created_at": -1, "_id": 1 })
                    .build(),
            )
            .await?;
        Ok(())
    }

    fn lists(&self) -> Collection<ListDocument> {
        self.db.collection::<ListDocument>("lists")
    }

    fn tasks(&self) -> Collection<TaskDocument> {
        self.db.collection::<TaskDocument>("tasks")
    }

    async fn next_id(&self, sequence: &str) -> StorageResult<i64> {
        let counters = self.db.collection::<Counter>("counters");
        let counter = counters
            .find_one_and_update(doc! { "_id": sequence }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| StorageError::Corrupt(format!("counter {sequence} missing")))?;
        Ok(counter.seq)
    }
}

fn now() -> BsonDateTime {
    BsonDateTime::from_millis(Utc::now().timestamp_millis())
}

fn list_update(changes: ListChanges) -> Document {
    let mut set_doc = doc! { "updated_at": now() };
    if let Some(name) = changes.name {
        set_doc.insert("name", name);
    }
    if let Some(list_type) = changes.list_type {
        set_doc.insert("list_type", list_type.map_or(Bson::Null, Bson::String));
    }
    doc! { "$set": set_doc }
}

fn task_update(changes: TaskChanges) -> Document {
    let mut set_doc = doc! { "updated_at": now() };
    if let Some(text) = changes.text {
        set_doc.insert("text", text);
    }
    if let Some(is_completed) = changes.is_completed {
        set_doc.insert("is_completed", is_completed);
    }
    doc! { "$set": set_doc }
}

#[async_trait]
impl Storage for MongoStorage {
    async fn get_lists(&self, owner_id: &str) -> StorageResult<Vec<List>> {
        let cursor = self
            .lists()
            .find(doc! { "owner_id": owner_id })
            .sort(doc! { "created_at": -1, "_id": 1 })
            .await?;
        let docs: Vec<ListDocument> = cursor.try_collect().await?;
        docs.into_iter().map(List::try_from).collect()
    }

    async fn get_list(&self, id: i64) -> StorageResult<Option<List>> {
        self.lists()
            .find_one(doc! { "_id": id })
            .await?
            .map(List::try_from)
            .transpose()
    }

    async fn create_list(&self, owner_id: &str, list: NewList) -> StorageResult<List> {
        let created_at = now();
        let new_list = ListDocument {
            id: self.next_id("lists").await?,
            owner_id: owner_id.to_string(),
            name: list.name,
            list_type: list.list_type,
            created_at,
            updated_at: created_at,
        };
        self.lists().insert_one(&new_list).await?;
        List::try_from(new_list)
    }

    async fn update_list(&self, id: i64, changes: ListChanges) -> StorageResult<List> {
        self.lists()
            .find_one_and_update(doc! { "_id": id }, list_update(changes))
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(StorageError::NotFound("List"))
            .and_then(List::try_from)
    }

    async fn delete_list(&self, id: i64) -> StorageResult<()> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        let tasks = self
            .tasks()
            .delete_many(doc! { "list_id": id })
            .session(&mut session)
            .await?;
        self.lists()
            .delete_one(doc! { "_id": id })
            .session(&mut session)
            .await?;
        session.commit_transaction().await?;
        debug!("Deleted list {} and {} task(s)", id, tasks.deleted_count);
        Ok(())
    }

    async fn get_tasks(&self, list_id: i64) -> StorageResult<Vec<Task>> {
        let cursor = self
            .tasks()
            .find(doc! { "list_id": list_id })
            .sort(doc! { "created_at": -1, "_id": 1 })
            .await?;
        let docs: Vec<TaskDocument> = cursor.try_collect().await?;
        docs.into_iter().map(Task::try_from).collect()
    }

    async fn get_task(&self, id: i64) -> StorageResult<Option<Task>> {
        self.tasks()
            .find_one(doc! { "_id": id })
            .await?
            .map(Task::try_from)
            .transpose()
    }

    async fn create_task(&self, list_id: i64, task: NewTask) -> StorageResult<Task> {
        let created_at = now();
        let new_task = TaskDocument {
            id: self.next_id("tasks").await?,
            list_id,
            text: task.text,
            is_completed: task.is_completed,
            created_at,
            updated_at: created_at,
        };

        // The parent write conflicts with a concurrent delete_list of the same
        // list, so one of the two transactions aborts.
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        let parent = self
            .db
            .collection::<Document>("lists")
            .update_one(doc! { "_id": list_id }, doc! { "$inc": { "task_writes": 1_i64 } })
            .session(&mut session)
            .await?;
        if parent.matched_count == 0 {
            session.abort_transaction().await?;
            return Err(StorageError::NotFound("List"));
        }
        self.tasks()
            .insert_one(&new_task)
            .session(&mut session)
            .await?;
        session.commit_transaction().await?;
        Task::try_from(new_task)
    }

    async fn update_task(&self, id: i64, changes: TaskChanges) -> StorageResult<Task> {
        self.tasks()
            .find_one_and_update(doc! { "_id": id }, task_update(changes))
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(StorageError::NotFound("Task"))
            .and_then(Task::try_from)
    }

    async fn delete_task(&self, id: i64) -> StorageResult<bool> {
        let result = self.tasks().delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}
