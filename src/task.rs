//! Task data structures.
//!
//! This module defines the core `Task` record together with its owned
//! `Subtask` and `Attachment` children, plus the draft/patch payloads the
//! store accepts for creation and partial update.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::Priority;

/// Category every task falls back to when its own category is removed.
pub const DEFAULT_CATEGORY: &str = "General";

/// A to-do item with schedule, category, priority and completion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due: NaiveDate,
    /// Optional time-of-day. Ignored for date partitioning, used only for
    /// display and intra-day sorting.
    #[serde(default)]
    pub due_time: Option<NaiveTime>,
    pub category: String,
    pub priority: Priority,
    pub completed: bool,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A checklist item owned by exactly one task. Ids are unique within the
/// owning task's subtask list only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: u32,
    pub title: String,
    pub completed: bool,
}

/// Persisted attachment metadata. The binary content itself is never
/// stored; it exists only as a transient staged handle during form entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub name: String,
    pub size: u64,
    pub mime: String,
}

/// Caller-supplied fields for task creation. Identity, completion flag and
/// timestamps are assigned by the store and cannot be provided here.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due: NaiveDate,
    pub due_time: Option<NaiveTime>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub project: Option<String>,
    pub subtasks: Vec<String>,
    pub attachments: Vec<Attachment>,
}

/// Partial update merged over an existing task. `None` leaves the field
/// untouched; the nested options distinguish "leave" from "clear".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due: Option<NaiveDate>,
    pub due_time: Option<Option<NaiveTime>>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub project: Option<Option<String>>,
    pub attachments: Option<Vec<Attachment>>,
}

impl TaskPatch {
    /// True when the patch carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due.is_none()
            && self.due_time.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.project.is_none()
            && self.attachments.is_none()
    }
}
