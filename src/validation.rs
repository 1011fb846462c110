// src/validation.rs
//
// Turns raw JSON bodies into typed create/update inputs. Fields are checked in
// declaration order and the first violation is reported. Server-controlled
// fields (id, ownerId, listId, timestamps, ...) are never read.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{ListChanges, NewList, NewTask, TaskChanges};

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn for_field(field: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}

pub fn new_list(body: &Value) -> Result<NewList, ValidationError> {
    let fields = as_object(body)?;
    Ok(NewList {
        name: required_text(fields, "name")?,
        list_type: nullable_string(fields, "type")?.flatten(),
    })
}

pub fn list_changes(body: &Value) -> Result<ListChanges, ValidationError> {
    let fields = as_object(body)?;
    Ok(ListChanges {
        name: optional_text(fields, "name")?,
        list_type: nullable_string(fields, "type")?,
    })
}

pub fn new_task(body: &Value) -> Result<NewTask, ValidationError> {
    let fields = as_object(body)?;
    Ok(NewTask {
        text: required_text(fields, "text")?,
        is_completed: optional_bool(fields, "isCompleted")?.unwrap_or(false),
    })
}

pub fn task_changes(body: &Value) -> Result<TaskChanges, ValidationError> {
    let fields = as_object(body)?;
    Ok(TaskChanges {
        text: optional_text(fields, "text")?,
        is_completed: optional_bool(fields, "isCompleted")?,
    })
}

/// Parses a request body as JSON. Handlers call this only after the target
/// resource has been found and authorized.
pub fn json_body(content_type: &str, body: &[u8]) -> Result<Value, ValidationError> {
    let is_json = content_type == "application/json"
        || (content_type.starts_with("application/") && content_type.ends_with("+json"));
    if !is_json {
        return Err(ValidationError::new("Content-Type must be application/json"));
    }
    serde_json::from_slice(body)
        .map_err(|e| ValidationError::new(format!("Invalid JSON body: {}", e)))
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationError> {
    body.as_object()
        .ok_or_else(|| ValidationError::new("Request body must be a JSON object"))
}

fn required_text(fields: &Map<String, Value>, name: &str) -> Result<String, ValidationError> {
    optional_text(fields, name)?
        .ok_or_else(|| ValidationError::for_field(name, format!("{name} is required")))
}

/// Absent (or null) means "not supplied"; otherwise a non-blank string.
fn optional_text(
    fields: &Map<String, Value>,
    name: &str,
) -> Result<Option<String>, ValidationError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ValidationError::for_field(
            name,
            format!("{name} must not be empty"),
        )),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(type_mismatch(name, "string", other)),
    }
}

/// Outer `None` is absent; `Some(None)` is an explicit null.
fn nullable_string(
    fields: &Map<String, Value>,
    name: &str,
) -> Result<Option<Option<String>>, ValidationError> {
    match fields.get(name) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::String(s)) => Ok(Some(Some(s.clone()))),
        Some(other) => Err(type_mismatch(name, "string", other)),
    }
}

fn optional_bool(fields: &Map<String, Value>, name: &str) -> Result<Option<bool>, ValidationError> {
    match fields.get(name) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(type_mismatch(name, "boolean", other)),
    }
}

fn type_mismatch(name: &str, expected: &str, got: &Value) -> ValidationError {
    let received = match got {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    ValidationError::for_field(name, format!("Expected {expected}, received {received}"))
}
