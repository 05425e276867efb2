//! Client Models
//!
//! Local entity shapes, the drafts used to create them, the patches used to
//! update them, and the remote row shapes they map to.

mod project;
mod profile;
mod task;
mod team;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use project::{NewProjectRow, Project, ProjectDraft, ProjectPatch, ProjectPriority, ProjectRow, ProjectRowPatch, ProjectStatus};
pub use profile::{Profile, ProfileFlag};
pub use task::{NewTaskRow, Subtask, Task, TaskDraft, TaskPatch, TaskPriority, TaskRow, TaskRowPatch, TaskStatus};
pub use team::{AccessLevel, Department, MemberStatus, NewTeamMemberRow, TeamMember, TeamMemberDraft, TeamMemberPatch, TeamMemberRow, TeamMemberRowPatch};

/// Identifier of an authenticated account (also the profile id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Core trait for every record type held by an entity store.
///
/// Ties the local shape to its remote counterparts and defines the
/// bidirectional field mapping between them.
pub trait Entity: Sized + Clone + Send + Sync + 'static {
    /// Row as returned by the remote service
    type Row: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;
    /// Fields supplied by the caller when creating a record
    type Draft: Clone + Send + Sync + 'static;
    /// Insert payload (draft plus owner, without id or creation time)
    type NewRow: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;
    /// Local partial update
    type Patch: Clone + Send + Sync + 'static;
    /// Remote partial update (only present fields serialize)
    type RowPatch: Serialize + Clone + Send + Sync + 'static;

    /// Remote collection name
    const TABLE: &'static str;

    /// Returns the server-assigned identifier
    fn id(&self) -> &str;

    fn from_row(row: Self::Row) -> Self;

    fn new_row(draft: &Self::Draft, owner: &AccountId) -> Self::NewRow;

    fn row_patch(patch: &Self::Patch) -> Self::RowPatch;

    /// Merge a patch into the local record
    fn apply(&mut self, patch: &Self::Patch);
}

/// Category shared by tasks and projects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    #[default]
    Work,
    Personal,
    Design,
    Meeting,
    Dev,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Personal,
        Category::Design,
        Category::Meeting,
        Category::Dev,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Design => "Design",
            Category::Meeting => "Meeting",
            Category::Dev => "Dev",
        }
    }

    /// Case-insensitive lookup by label
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label.trim()))
    }
}
