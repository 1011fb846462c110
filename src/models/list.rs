use chrono::{DateTime, Utc};
use serde::Serialize;

/// A named container of tasks, visible only to its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: i64,
    pub owner_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub list_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated client input for creating a list. The owner is injected from
/// the authenticated principal, never taken from here.
#[derive(Debug, Clone, PartialEq)]
pub struct NewList {
    pub name: String,
    pub list_type: Option<String>,
}

/// Validated partial update. `list_type: Some(None)` clears the category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListChanges {
    pub name: Option<String>,
    pub list_type: Option<Option<String>>,
}
