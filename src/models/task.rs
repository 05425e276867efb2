//! Task Entity
//!
//! A unit of work shown on the board, the calendar and the task list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Category, Entity};
use crate::schedule::Schedule;

/// Board column a task sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "In Review")]
    InReview,
    Done,
}

impl TaskStatus {
    /// Columns in board order
    pub const COLUMNS: [TaskStatus; 4] = [
        TaskStatus::ToDo,
        TaskStatus::InProgress,
        TaskStatus::InReview,
        TaskStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::InReview => "In Review",
            TaskStatus::Done => "Done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskPriority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Critical => "Critical",
            TaskPriority::High => "High",
            TaskPriority::Normal => "Normal",
            TaskPriority::Low => "Low",
        }
    }
}

/// Checklist entry inside a task (stored inline with the task row)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// A task as held in local state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    /// Name of the team member the task is assigned to
    pub assignee: Option<String>,
    pub tags: Vec<String>,
    pub subtasks: Vec<Subtask>,
    pub schedule: Option<Schedule>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Date field as shown in forms (`YYYY-MM-DD` or empty)
    pub fn date(&self) -> String {
        self.schedule.map(|s| s.date_string()).unwrap_or_default()
    }

    /// Time field as shown in forms (`HH:MM` or empty)
    pub fn time(&self) -> String {
        self.schedule.map(|s| s.time_string()).unwrap_or_default()
    }
}

/// Fields for creating a task
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub assignee: Option<String>,
    pub tags: Vec<String>,
    pub subtasks: Vec<Subtask>,
    pub schedule: Option<Schedule>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update of a task.
///
/// Date and time travel together as one [`Schedule`], so an update can
/// never overwrite one half while leaving the other stale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskPatch {
    title: Option<String>,
    description: Option<Option<String>>,
    category: Option<Category>,
    priority: Option<TaskPriority>,
    status: Option<TaskStatus>,
    assignee: Option<Option<String>>,
    tags: Option<Vec<String>>,
    subtasks: Option<Vec<Subtask>>,
    schedule: Option<Option<Schedule>>,
    completed: Option<bool>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn assignee(mut self, assignee: Option<String>) -> Self {
        self.assignee = Some(assignee);
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn subtasks(mut self, subtasks: Vec<Subtask>) -> Self {
        self.subtasks = Some(subtasks);
        self
    }

    /// Set (or with `None`, clear) the due date and time together
    pub fn schedule(mut self, schedule: Option<Schedule>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Task row in the remote `tasks` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub user_id: AccountId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: Category,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the remote `tasks` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTaskRow {
    pub user_id: AccountId,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub assignee: Option<String>,
    pub tags: Vec<String>,
    pub subtasks: Vec<Subtask>,
    pub due_date: Option<String>,
    pub completed: bool,
}

/// Remote partial update; absent fields are left untouched, `Some(None)` writes null
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TaskRowPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl Entity for Task {
    type Row = TaskRow;
    type Draft = TaskDraft;
    type NewRow = NewTaskRow;
    type Patch = TaskPatch;
    type RowPatch = TaskRowPatch;

    const TABLE: &'static str = "tasks";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: TaskRow) -> Self {
        Self {
            schedule: row.due_date.as_deref().and_then(Schedule::from_due_date),
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            priority: row.priority,
            status: row.status,
            assignee: row.assignee,
            tags: row.tags.unwrap_or_default(),
            subtasks: row.subtasks.unwrap_or_default(),
            completed: row.completed,
            created_at: row.created_at,
        }
    }

    fn new_row(draft: &TaskDraft, owner: &AccountId) -> NewTaskRow {
        NewTaskRow {
            user_id: owner.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category,
            priority: draft.priority,
            status: draft.status,
            assignee: draft.assignee.clone(),
            tags: draft.tags.clone(),
            subtasks: draft.subtasks.clone(),
            due_date: draft.schedule.map(|s| s.to_due_date()),
            completed: false,
        }
    }

    fn row_patch(patch: &TaskPatch) -> TaskRowPatch {
        TaskRowPatch {
            title: patch.title.clone(),
            description: patch.description.clone(),
            category: patch.category,
            priority: patch.priority,
            status: patch.status,
            assignee: patch.assignee.clone(),
            tags: patch.tags.clone(),
            subtasks: patch.subtasks.clone(),
            due_date: patch.schedule.map(|s| s.map(|s| s.to_due_date())),
            completed: patch.completed,
        }
    }

    fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(assignee) = &patch.assignee {
            self.assignee = assignee.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(subtasks) = &patch.subtasks {
            self.subtasks = subtasks.clone();
        }
        if let Some(schedule) = patch.schedule {
            self.schedule = schedule;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}
