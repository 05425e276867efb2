//! Project Entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Category, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProjectStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    #[default]
    Planning,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProjectPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::Planning => "Planning",
            ProjectStatus::Completed => "Completed",
        }
    }
}

impl ProjectPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectPriority::High => "High",
            ProjectPriority::Medium => "Medium",
            ProjectPriority::Low => "Low",
        }
    }
}

/// A project as held in local state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Free-form budget text as entered ("$12k")
    pub budget: String,
    pub priority: ProjectPriority,
    pub category: Category,
    /// Names of the team members on the project
    pub team_members: Vec<String>,
    pub status: ProjectStatus,
    /// Accent colour classes used by the card
    pub color: String,
    pub bg: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a project
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: String,
    pub priority: ProjectPriority,
    pub category: Category,
    pub team_members: Vec<String>,
    pub status: ProjectStatus,
    pub color: String,
    pub bg: String,
}

impl ProjectDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update of a project
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectPatch {
    title: Option<String>,
    description: Option<String>,
    start_date: Option<Option<NaiveDate>>,
    end_date: Option<Option<NaiveDate>>,
    budget: Option<String>,
    priority: Option<ProjectPriority>,
    category: Option<Category>,
    team_members: Option<Vec<String>>,
    status: Option<ProjectStatus>,
    color: Option<String>,
    bg: Option<String>,
}

impl ProjectPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn start_date(mut self, date: Option<NaiveDate>) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: Option<NaiveDate>) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn budget(mut self, budget: impl Into<String>) -> Self {
        self.budget = Some(budget.into());
        self
    }

    pub fn priority(mut self, priority: ProjectPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn team_members(mut self, members: Vec<String>) -> Self {
        self.team_members = Some(members);
        self
    }

    pub fn status(mut self, status: ProjectStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn colors(mut self, color: impl Into<String>, bg: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self.bg = Some(bg.into());
        self
    }
}

/// Project row in the remote `projects` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRow {
    pub id: String,
    pub user_id: AccountId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: Option<String>,
    pub priority: ProjectPriority,
    pub category: Category,
    #[serde(default)]
    pub team_members: Option<Vec<String>>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub bg: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the remote `projects` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProjectRow {
    pub user_id: AccountId,
    pub title: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: String,
    pub priority: ProjectPriority,
    pub category: Category,
    pub team_members: Vec<String>,
    pub status: ProjectStatus,
    pub color: String,
    pub bg: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProjectRowPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<ProjectPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_members: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg: Option<String>,
}

impl Entity for Project {
    type Row = ProjectRow;
    type Draft = ProjectDraft;
    type NewRow = NewProjectRow;
    type Patch = ProjectPatch;
    type RowPatch = ProjectRowPatch;

    const TABLE: &'static str = "projects";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            start_date: row.start_date,
            end_date: row.end_date,
            budget: row.budget.unwrap_or_default(),
            priority: row.priority,
            category: row.category,
            team_members: row.team_members.unwrap_or_default(),
            status: row.status,
            color: row.color.unwrap_or_default(),
            bg: row.bg.unwrap_or_default(),
            created_at: row.created_at,
        }
    }

    fn new_row(draft: &ProjectDraft, owner: &AccountId) -> NewProjectRow {
        NewProjectRow {
            user_id: owner.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            budget: draft.budget.clone(),
            priority: draft.priority,
            category: draft.category,
            team_members: draft.team_members.clone(),
            status: draft.status,
            color: draft.color.clone(),
            bg: draft.bg.clone(),
        }
    }

    fn row_patch(patch: &ProjectPatch) -> ProjectRowPatch {
        ProjectRowPatch {
            title: patch.title.clone(),
            description: patch.description.clone(),
            start_date: patch.start_date,
            end_date: patch.end_date,
            budget: patch.budget.clone(),
            priority: patch.priority,
            category: patch.category,
            team_members: patch.team_members.clone(),
            status: patch.status,
            color: patch.color.clone(),
            bg: patch.bg.clone(),
        }
    }

    fn apply(&mut self, patch: &ProjectPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(start) = patch.start_date {
            self.start_date = start;
        }
        if let Some(end) = patch.end_date {
            self.end_date = end;
        }
        if let Some(budget) = &patch.budget {
            self.budget = budget.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(members) = &patch.team_members {
            self.team_members = members.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(bg) = &patch.bg {
            self.bg = bg.clone();
        }
    }
}
